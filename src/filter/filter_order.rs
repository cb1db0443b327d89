use super::filter_where::quote;
use super::types::FilterOrderInfo;

pub struct FilterOrder;

impl FilterOrder {
    /// Newest first, with id as a stable tiebreaker.
    pub fn newest_first() -> Vec<FilterOrderInfo> {
        vec![
            FilterOrderInfo { column: "created_at".to_string() },
            FilterOrderInfo { column: "id".to_string() },
        ]
    }

    pub fn generate(infos: &[FilterOrderInfo]) -> String {
        if infos.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = infos
            .iter()
            .map(|i| format!("{} DESC", quote(&i.column)))
            .collect();
        format!("ORDER BY {}", parts.join(", "))
    }
}
