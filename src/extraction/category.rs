//! Mapping free-text category names to canonical identifiers.

use crate::ledger::Category;

/// Identifier used when no category matches.
pub const OTHER_CATEGORY: &str = "other";

/// Keyword to canonical identifier, checked in order by case-insensitive
/// substring match.
const SYNONYMS: &[(&str, &str)] = &[
    ("餐饮", "food"),
    ("食物", "food"),
    ("吃饭", "food"),
    ("早餐", "food"),
    ("午餐", "food"),
    ("晚餐", "food"),
    ("外卖", "food"),
    ("咖啡", "food"),
    ("food", "food"),
    ("dining", "food"),
    ("restaurant", "food"),
    ("grocer", "food"),
    ("交通", "transport"),
    ("出行", "transport"),
    ("打车", "transport"),
    ("地铁", "transport"),
    ("加油", "transport"),
    ("transport", "transport"),
    ("taxi", "transport"),
    ("travel", "transport"),
    ("购物", "shopping"),
    ("超市", "shopping"),
    ("shopping", "shopping"),
    ("娱乐", "entertainment"),
    ("电影", "entertainment"),
    ("游戏", "entertainment"),
    ("entertainment", "entertainment"),
    ("医疗", "health"),
    ("药", "health"),
    ("health", "health"),
    ("medical", "health"),
    ("教育", "education"),
    ("培训", "education"),
    ("education", "education"),
    ("住房", "housing"),
    ("房租", "housing"),
    ("水电", "housing"),
    ("rent", "housing"),
    ("housing", "housing"),
    ("工资", "salary"),
    ("薪", "salary"),
    ("salary", "salary"),
    ("wage", "salary"),
    ("投资", "investment"),
    ("理财", "investment"),
    ("股票", "investment"),
    ("investment", "investment"),
];

/// Resolves a category name emitted by the model.
///
/// An exact id or display-name match against `categories` wins, then the
/// synonym table, then [`OTHER_CATEGORY`].
pub fn map_category(name: Option<&str>, categories: &[Category]) -> String {
    let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
        return OTHER_CATEGORY.to_string();
    };
    let lower = name.to_lowercase();

    if let Some(category) = categories
        .iter()
        .find(|c| c.id.to_lowercase() == lower || c.name.to_lowercase() == lower)
    {
        return category.id.clone();
    }

    SYNONYMS
        .iter()
        .find(|(keyword, _)| lower.contains(keyword))
        .map_or_else(|| OTHER_CATEGORY.to_string(), |(_, id)| (*id).to_string())
}
