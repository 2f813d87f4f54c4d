//! Offline replies used when no provider is configured.

/// Reply when no topic matches.
pub const FALLBACK_REPLY: &str =
    "暂时无法回答这个问题。在设置中启用AI服务并填写API密钥后，可以获得更完整的回答。";

const BUDGET_REPLY: &str = "📊 **关于预算**\n\n可以从50/30/20法则入手：\n• 50%用于房租、饮食等必需开支\n• 30%用于娱乐、购物等个人开支\n• 20%用于储蓄和投资\n\n每月底回顾一次执行情况，再按实际调整各分类额度。";

const SAVINGS_REPLY: &str = "💰 **关于储蓄**\n\n发工资当天先把一部分自动转入储蓄账户，目标是收入的20%以上。\n\n可以分成几个账户：\n• 应急金（3到6个月生活费）\n• 短期目标\n• 长期投资";

const INVESTMENT_REPLY: &str = "📈 **关于投资**\n\n先备好应急金再开始投资。新手可以从低费率的指数基金开始，坚持定期定额、分散配置、长期持有，避免频繁买卖。";

const DEBT_REPLY: &str = "📋 **关于还债**\n\n把所有欠款按利率从高到低列出来，优先偿还高息债务；每月尽量多于最低还款额，同时避免产生新的消费贷。";

const INCOME_REPLY: &str = "💼 **关于增加收入**\n\n可以考虑争取加薪或晋升、学习新技能、发展副业，或者出租闲置的房间和车位。";

const TOPICS: &[(&[&str], &str)] = &[
    (&["预算", "budget"], BUDGET_REPLY),
    (&["储蓄", "存钱", "省钱", "saving"], SAVINGS_REPLY),
    (&["投资", "理财", "invest"], INVESTMENT_REPLY),
    (&["债务", "还款", "贷款", "debt"], DEBT_REPLY),
    (&["收入", "加薪", "副业", "income"], INCOME_REPLY),
];

/// Picks the canned reply for a question by keyword.
pub fn reply(question: &str) -> &'static str {
    let lower = question.to_lowercase();
    TOPICS
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
        .map_or(FALLBACK_REPLY, |(_, reply)| *reply)
}
