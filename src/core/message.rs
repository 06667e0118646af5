/// Short confirmation shown after a purchase is recorded.
pub fn issuecoin_message(category: &str, amount_czk: f64) -> String {
    let category = if category.trim().is_empty() {
        "nákup"
    } else {
        category
    };
    format!(
        "✅ Record saved. Category: {}, amount ~ {:.2} CZK.",
        category, amount_czk
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message() {
        assert_eq!(
            issuecoin_message("Drogéria", 129.0),
            "✅ Record saved. Category: Drogéria, amount ~ 129.00 CZK."
        );
        assert!(issuecoin_message("", 0.0).contains("Category: nákup"));
    }
}
