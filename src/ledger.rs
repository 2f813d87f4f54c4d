//! Finance records owned by the host application.
//!
//! The gateway never stores these; it reads them to build prompts and hands
//! extracted candidates back for the host to persist.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Budget category value meaning "every expense".
pub const ALL_CATEGORIES: &str = "all";

/// A canonical transaction category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Stable identifier, e.g. `food`.
    pub id: String,
    /// Display name, e.g. `餐饮`.
    pub name: String,
}

impl Category {
    /// Creates a category.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// The categories a new ledger starts with.
    pub fn defaults() -> Vec<Self> {
        [
            ("food", "餐饮"),
            ("transport", "交通"),
            ("entertainment", "娱乐"),
            ("shopping", "购物"),
            ("health", "医疗"),
            ("education", "教育"),
            ("housing", "住房"),
            ("salary", "工资"),
            ("investment", "投资"),
            ("other", "其他"),
        ]
        .into_iter()
        .map(|(id, name)| Self::new(id, name))
        .collect()
    }
}

/// Direction of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money received.
    Income,
    /// Money spent.
    Expense,
}

impl TransactionKind {
    /// Interprets a free-text type label; anything but income is an expense.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        if label.eq_ignore_ascii_case("income") || label == "收入" {
            Self::Income
        } else {
            Self::Expense
        }
    }
}

/// A persisted transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Income or expense.
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// Positive amount.
    pub amount: f64,
    /// Category identifier.
    pub category: String,
    /// Calendar date.
    pub date: NaiveDate,
    /// Free-text note.
    #[serde(default)]
    pub description: String,
}

/// Budget period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriod {
    /// Resets every month.
    Monthly,
    /// Resets every year.
    Yearly,
}

/// A spending limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    /// Display name.
    pub name: String,
    /// Category identifier, or [`ALL_CATEGORIES`].
    pub category: String,
    /// Limit amount.
    pub amount: f64,
    /// Budget period.
    pub period: BudgetPeriod,
}

impl Budget {
    fn covers(&self, entry: &LedgerEntry) -> bool {
        entry.kind == TransactionKind::Expense
            && (self.category == ALL_CATEGORIES || self.category == entry.category)
    }
}

/// Expense total for one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    /// Category display name (or identifier when unknown).
    pub name: String,
    /// Sum of expenses.
    pub amount: f64,
}

/// Spending measured against one budget.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetUsage {
    /// Budget name.
    pub name: String,
    /// Matching expenses.
    pub spent: f64,
    /// Budget limit.
    pub limit: f64,
}

impl BudgetUsage {
    /// Spent share of the limit, in percent.
    pub fn usage_percent(&self) -> f64 {
        if self.limit > 0.0 {
            self.spent / self.limit * 100.0
        } else {
            0.0
        }
    }
}

/// Aggregate view of a ledger used to brief the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialSnapshot {
    /// Sum of income.
    pub total_income: f64,
    /// Sum of expenses.
    pub total_expense: f64,
    /// Income minus expenses.
    pub balance: f64,
    /// Balance as a percentage of income; zero without income.
    pub savings_rate: f64,
    /// Expense totals in order of first appearance.
    pub expense_by_category: Vec<CategoryTotal>,
    /// Usage of each budget.
    pub budgets: Vec<BudgetUsage>,
    /// Number of ledger entries.
    pub transaction_count: usize,
    /// Number of categories.
    pub category_count: usize,
}

impl FinancialSnapshot {
    /// Summarises ledger records.
    pub fn summarize(entries: &[LedgerEntry], categories: &[Category], budgets: &[Budget]) -> Self {
        let sum = |kind: TransactionKind| -> f64 {
            entries
                .iter()
                .filter(|e| e.kind == kind)
                .map(|e| e.amount)
                .sum()
        };
        let total_income = sum(TransactionKind::Income);
        let total_expense = sum(TransactionKind::Expense);
        let balance = total_income - total_expense;
        let savings_rate = if total_income > 0.0 {
            balance / total_income * 100.0
        } else {
            0.0
        };

        let mut expense_by_category: Vec<CategoryTotal> = Vec::new();
        for entry in entries.iter().filter(|e| e.kind == TransactionKind::Expense) {
            let name = categories
                .iter()
                .find(|c| c.id == entry.category)
                .map_or_else(|| entry.category.clone(), |c| c.name.clone());
            match expense_by_category.iter_mut().find(|t| t.name == name) {
                Some(total) => total.amount += entry.amount,
                None => expense_by_category.push(CategoryTotal {
                    name,
                    amount: entry.amount,
                }),
            }
        }

        let budgets = budgets
            .iter()
            .map(|budget| BudgetUsage {
                name: budget.name.clone(),
                spent: entries
                    .iter()
                    .filter(|e| budget.covers(e))
                    .map(|e| e.amount)
                    .sum(),
                limit: budget.amount,
            })
            .collect();

        Self {
            total_income,
            total_expense,
            balance,
            savings_rate,
            expense_by_category,
            budgets,
            transaction_count: entries.len(),
            category_count: categories.len(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn entry(kind: TransactionKind, amount: f64, category: &str) -> LedgerEntry {
        LedgerEntry {
            kind,
            amount,
            category: category.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            description: String::new(),
        }
    }

    #[test]
    fn summarize_totals_and_rates() {
        let entries = vec![
            entry(TransactionKind::Income, 10_000.0, "salary"),
            entry(TransactionKind::Expense, 300.0, "food"),
            entry(TransactionKind::Expense, 200.0, "food"),
            entry(TransactionKind::Expense, 500.0, "mystery"),
        ];
        let budgets = vec![
            Budget {
                name: "Food".to_string(),
                category: "food".to_string(),
                amount: 1000.0,
                period: BudgetPeriod::Monthly,
            },
            Budget {
                name: "Everything".to_string(),
                category: ALL_CATEGORIES.to_string(),
                amount: 2000.0,
                period: BudgetPeriod::Monthly,
            },
        ];
        let snapshot = FinancialSnapshot::summarize(&entries, &Category::defaults(), &budgets);

        assert_eq!(snapshot.total_income, 10_000.0);
        assert_eq!(snapshot.total_expense, 1000.0);
        assert_eq!(snapshot.balance, 9000.0);
        assert!((snapshot.savings_rate - 90.0).abs() < 1e-9);
        assert_eq!(
            snapshot.expense_by_category,
            vec![
                CategoryTotal { name: "餐饮".to_string(), amount: 500.0 },
                CategoryTotal { name: "mystery".to_string(), amount: 500.0 },
            ]
        );
        assert!((snapshot.budgets[0].usage_percent() - 50.0).abs() < 1e-9);
        assert_eq!(snapshot.budgets[1].spent, 1000.0);
        assert_eq!(snapshot.transaction_count, 4);
    }

    #[test]
    fn savings_rate_is_zero_without_income() {
        let snapshot = FinancialSnapshot::summarize(
            &[entry(TransactionKind::Expense, 50.0, "food")],
            &[],
            &[],
        );
        assert_eq!(snapshot.savings_rate, 0.0);
        assert_eq!(snapshot.balance, -50.0);
    }

    #[test]
    fn kind_labels() {
        let kind = TransactionKind::from_label;
        assert_eq!(kind("Income"), TransactionKind::Income);
        assert_eq!(kind("收入"), TransactionKind::Income);
        assert_eq!(kind("expense"), TransactionKind::Expense);
        assert_eq!(kind("refund"), TransactionKind::Expense);
    }

    #[test]
    fn entry_uses_type_key() {
        let json = serde_json::to_value(entry(TransactionKind::Expense, 1.0, "food")).unwrap();
        assert_eq!(json["type"], "expense");
        assert_eq!(json["date"], "2024-05-01");
    }
}
