//! Prompts for transaction extraction and receipt OCR.

use crate::ledger::Category;

/// System instruction for extraction calls.
pub const EXTRACTION_SYSTEM_PROMPT: &str =
    "你是一个记账助手，负责从文本中提取结构化的交易记录。只输出JSON，不要输出其他内容。";

/// Instruction sent with a receipt image.
pub const RECEIPT_OCR_PROMPT: &str =
    "请识别这张图片中的所有文字，尤其是商家名称、商品明细、金额和日期。按原样输出识别到的文字，不要添加解释。";

/// Builds the extraction instruction for `source_text`.
pub fn extraction_prompt(source_text: &str, categories: &[Category]) -> String {
    let category_names = if categories.is_empty() {
        "其他".to_string()
    } else {
        categories
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join("、")
    };

    format!(
        r#"从下面的文本中找出所有交易（购物小票、账单、转账记录等）。

文本：
{source}

可选分类：{category_names}

只返回一个JSON对象，结构如下：
{{
  "transactions": [
    {{
      "type": "expense 或 income",
      "amount": 金额（正数）,
      "category": "上面列出的分类名称之一",
      "merchant": "商家或交易对象",
      "description": "简短描述",
      "date": "YYYY-MM-DD，没有日期时留空",
      "confidence": 0到1之间的识别置信度
    }}
  ]
}}

没有可识别的交易时返回 {{"transactions": []}}。"#,
        source = source_text.trim(),
    )
}
