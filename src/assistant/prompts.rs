//! Prompts for the finance assistant.

use crate::ledger::FinancialSnapshot;

/// System instruction for advisory calls.
pub const ADVISOR_SYSTEM_PROMPT: &str =
    "你是一名经验丰富的个人理财顾问，根据用户的收支数据给出务实、具体的建议。请使用简体中文，回答简明扼要。";

/// Short question used to verify connectivity.
pub const CONNECTION_TEST_PROMPT: &str = "这是一次连接测试，请只回复“连接成功”。";

/// Formats an amount as yuan with two decimals.
pub fn money(amount: f64) -> String {
    format!("¥{amount:.2}")
}

/// Wraps a user question, optionally prefixed with financial context.
pub fn question_prompt(question: &str, context: Option<&str>) -> String {
    match context.map(str::trim).filter(|c| !c.is_empty()) {
        Some(context) => format!("参考以下财务信息：\n{context}\n\n问题：{question}"),
        None => format!("理财问题：{question}"),
    }
}

/// Short context block describing a snapshot.
pub fn snapshot_context(snapshot: &FinancialSnapshot) -> String {
    format!(
        "- 总收入：{}\n- 总支出：{}\n- 交易笔数：{}\n- 分类数：{}\n- 预算数：{}",
        money(snapshot.total_income),
        money(snapshot.total_expense),
        snapshot.transaction_count,
        snapshot.category_count,
        snapshot.budgets.len(),
    )
}

/// Full analysis request for a snapshot.
pub fn analysis_prompt(snapshot: &FinancialSnapshot) -> String {
    let categories = if snapshot.expense_by_category.is_empty() {
        "- 暂无支出记录".to_string()
    } else {
        snapshot
            .expense_by_category
            .iter()
            .map(|t| format!("- {}：{}", t.name, money(t.amount)))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let budgets = if snapshot.budgets.is_empty() {
        "- 尚未设置预算".to_string()
    } else {
        snapshot
            .budgets
            .iter()
            .map(|b| {
                format!(
                    "- {}：已用 {:.1}%（{} / {}）",
                    b.name,
                    b.usage_percent(),
                    money(b.spent),
                    money(b.limit)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "请根据下面的财务数据做一次分析。\n\n\
         收支概况：\n\
         - 总收入：{income}\n\
         - 总支出：{expense}\n\
         - 结余：{balance}\n\
         - 储蓄率：{rate:.1}%\n\n\
         支出构成：\n{categories}\n\n\
         预算执行：\n{budgets}\n\n\
         请依次给出：整体评价、支出结构分析、可执行的改进建议、储蓄与投资建议。",
        income = money(snapshot.total_income),
        expense = money(snapshot.total_expense),
        balance = money(snapshot.balance),
        rate = snapshot.savings_rate,
    )
}
