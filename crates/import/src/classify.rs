use finsort_core::{Categories, ClassificationResult, Transaction, FALLBACK_CATEGORY};

/// Keyword classifier over a category mapping.
///
/// Categories are scanned in insertion order and keywords in stored order;
/// the first keyword found as a substring of the transaction details decides
/// the category. There is no scoring and no preference for longer keywords.
pub struct Classifier<'a> {
    categories: &'a Categories,
}

impl<'a> Classifier<'a> {
    pub fn new(categories: &'a Categories) -> Self {
        Self { categories }
    }

    /// Category whose keyword first matches `details`, if any.
    pub fn find_category(&self, details: &str) -> Option<&'a str> {
        let text = details.trim().to_lowercase();
        self.categories
            .iter()
            .filter(|c| !c.is_fallback())
            .find(|c| c.keywords.iter().any(|k| text.contains(k.as_str())))
            .map(|c| c.name.as_str())
    }

    /// Resets every row to the fallback and assigns keyword matches.
    pub fn classify_in_place<'t>(&self, transactions: impl IntoIterator<Item = &'t mut Transaction>) {
        let mut matched = 0usize;
        let mut total = 0usize;
        for tx in transactions {
            total += 1;
            tx.category = match self.find_category(&tx.details) {
                Some(name) => {
                    matched += 1;
                    name.to_string()
                }
                None => FALLBACK_CATEGORY.to_string(),
            };
        }
        tracing::debug!("Classified {total} transactions, {matched} matched a keyword");
    }

    /// Forces rows whose category is no longer in the mapping back to the
    /// fallback. Returns how many rows were reset.
    ///
    /// Matching only ever assigns known categories, but the mapping can change
    /// between passes (a category removed while a statement is on screen).
    pub fn enforce_known_categories<'t>(
        &self,
        transactions: impl IntoIterator<Item = &'t mut Transaction>,
    ) -> usize {
        let mut reset = 0;
        for tx in transactions {
            if !self.categories.contains(&tx.category) {
                tx.category = FALLBACK_CATEGORY.to_string();
                reset += 1;
            }
        }
        if reset > 0 {
            tracing::debug!("Reset {reset} transactions to {FALLBACK_CATEGORY}");
        }
        reset
    }

    /// Classifies a full result (both directions) in place.
    pub fn reclassify(&self, result: &mut ClassificationResult) {
        self.classify_in_place(result.iter_mut());
        self.enforce_known_categories(result.iter_mut());
    }
}

/// Classifies parsed transactions and splits them by direction.
pub fn classify(transactions: Vec<Transaction>, categories: &Categories) -> ClassificationResult {
    let mut result = ClassificationResult::from_transactions(transactions);
    Classifier::new(categories).reclassify(&mut result);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use finsort_core::{Direction, Money, RowId};

    fn make_tx(row: usize, details: &str, direction: Direction) -> Transaction {
        Transaction::new(
            RowId(row),
            "2024-01-15",
            details,
            Some(Money::from_cents(1000)),
            direction,
        )
    }

    fn categories(table: &[(&str, &[&str])]) -> Categories {
        let mut c = Categories::new();
        for (name, keywords) in table {
            c.create(name).unwrap();
            for k in *keywords {
                c.add_keyword(name, k).unwrap();
            }
        }
        c
    }

    #[test]
    fn contains_match_case_insensitive() {
        let c = categories(&[("Groceries", &["whole foods"])]);
        let classifier = Classifier::new(&c);
        assert_eq!(classifier.find_category("  WHOLE FOODS MARKET 123 "), Some("Groceries"));
        assert_eq!(classifier.find_category("STARBUCKS"), None);
    }

    #[test]
    fn first_category_in_order_wins() {
        let c = categories(&[("Groceries", &["market"]), ("Dining", &["market cafe"])]);
        let result = classify(vec![make_tx(0, "market cafe 42", Direction::Debit)], &c);
        assert_eq!(result.debits[0].category, "Groceries");
    }

    #[test]
    fn category_order_beats_position_in_text() {
        let c = categories(&[("Dining", &["cafe", "bistro"]), ("Travel", &["air"])]);
        let classifier = Classifier::new(&c);
        assert_eq!(classifier.find_category("Bistro Air"), Some("Dining"));
    }

    #[test]
    fn no_match_is_fallback() {
        let c = categories(&[("Dining", &["cafe"])]);
        let result = classify(vec![make_tx(0, "ELECTRIC CO", Direction::Debit)], &c);
        assert_eq!(result.debits[0].category, FALLBACK_CATEGORY);
    }

    #[test]
    fn empty_details_never_match() {
        let c = categories(&[("Dining", &["cafe"])]);
        let result = classify(vec![make_tx(0, "", Direction::Credit)], &c);
        assert_eq!(result.credits[0].category, FALLBACK_CATEGORY);
    }

    #[test]
    fn classification_is_idempotent() {
        let c = categories(&[("Dining", &["cafe"]), ("Rent", &["landlord"])]);
        let txs = vec![
            make_tx(0, "CAFE ROMA", Direction::Debit),
            make_tx(1, "LANDLORD LLC", Direction::Debit),
            make_tx(2, "SALARY", Direction::Credit),
        ];
        let first = classify(txs, &c);
        let mut second = first.clone();
        Classifier::new(&c).reclassify(&mut second);
        assert_eq!(first, second);
    }

    #[test]
    fn removed_category_reverts_to_fallback() {
        let mut c = categories(&[("Dining", &["cafe"])]);
        let mut result = classify(vec![make_tx(0, "CAFE ROMA", Direction::Debit)], &c);
        assert_eq!(result.debits[0].category, "Dining");

        c.remove("Dining").unwrap();
        let reset = Classifier::new(&c).enforce_known_categories(result.iter_mut());
        assert_eq!(reset, 1);
        assert_eq!(result.debits[0].category, FALLBACK_CATEGORY);
    }

    #[test]
    fn every_category_is_known_after_classify() {
        let c = categories(&[("Dining", &["cafe"])]);
        let mut result = classify(
            vec![
                make_tx(0, "CAFE", Direction::Debit),
                make_tx(1, "OTHER", Direction::Credit),
            ],
            &c,
        );
        result.credits[0].category = "Ghost".into();
        Classifier::new(&c).enforce_known_categories(result.iter_mut());
        assert!(result.iter().all(|t| c.contains(&t.category)));
    }
}
