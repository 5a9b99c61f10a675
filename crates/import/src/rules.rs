use extrato_core::{Amount, Category};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::contains_any;

/// Keyword and exception substrings for one category. Both are stored uppercased.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CategoryRule {
    pub keywords: Vec<String>,
    #[serde(default)]
    pub exceptions: Vec<String>,
}

impl CategoryRule {
    pub fn new<K, E>(keywords: K, exceptions: E) -> Self
    where
        K: IntoIterator,
        K::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        Self {
            keywords: keywords.into_iter().map(|k| k.as_ref().to_uppercase()).collect(),
            exceptions: exceptions.into_iter().map(|e| e.as_ref().to_uppercase()).collect(),
        }
    }

    fn normalized(self) -> Self {
        Self::new(self.keywords, self.exceptions)
    }

    /// `desc` must already be uppercased.
    fn matches_keyword(&self, desc: &str) -> bool {
        contains_any(desc, &self.keywords)
    }

    /// Keyword present and no exception present.
    fn matches(&self, desc: &str) -> bool {
        self.matches_keyword(desc) && !contains_any(desc, &self.exceptions)
    }
}

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("Failed to parse rules TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Rule set has no entry for {0}")]
    MissingCategory(Category),
    #[error("Rule set declares {0} more than once")]
    DuplicateCategory(Category),
}

#[derive(Debug, Deserialize)]
struct RuleFile {
    #[serde(rename = "rule", default)]
    rules: Vec<RuleEntry>,
}

#[derive(Debug, Deserialize)]
struct RuleEntry {
    category: Category,
    keywords: Vec<String>,
    #[serde(default)]
    exceptions: Vec<String>,
}

/// Ordered category rules. Declaration order decides which debit rule wins.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryRuleSet {
    rules: Vec<(Category, CategoryRule)>,
    payments: CategoryRule,
    income: CategoryRule,
}

const NO_EXCEPTIONS: [&str; 0] = [];

impl Default for CategoryRuleSet {
    fn default() -> Self {
        let payments = CategoryRule::new(["PAGAMENTO DE FATURA", "BOLETO"], NO_EXCEPTIONS);
        let income = CategoryRule::new(["TRANSFERÊNCIA RECEBIDA", "DEPÓSITO", "SALÁRIO"], ["-"]);
        let rules = vec![
            (
                Category::Alimentacao,
                CategoryRule::new(["OK SORVETES", "SUBWAY", "IFOOD", "RESTAURANTE", "PIZZARIA"], NO_EXCEPTIONS),
            ),
            (
                Category::Transporte,
                CategoryRule::new(["UBER", "TAXI", "POSTO DE GASOLINA", "PEDAGIO"], NO_EXCEPTIONS),
            ),
            (
                Category::Conveniencia,
                CategoryRule::new(["ESTACAO CONVENIENCIA", "MERCADINHO", "DROGARIA"], NO_EXCEPTIONS),
            ),
            (
                Category::Investimentos,
                CategoryRule::new(["APLICAÇÃO RDB", "CDB", "TESOURO DIRETO"], NO_EXCEPTIONS),
            ),
            (Category::Receitas, income.clone()),
            (Category::Pagamentos, payments.clone()),
        ];
        Self {
            rules,
            payments,
            income,
        }
    }
}

impl CategoryRuleSet {
    /// Builds a rule set; `PAGAMENTOS` and `RECEITAS` must both be present.
    pub fn from_rules(rules: Vec<(Category, CategoryRule)>) -> Result<Self, RuleError> {
        let mut seen = Vec::with_capacity(rules.len());
        for (category, _) in &rules {
            if seen.contains(category) {
                return Err(RuleError::DuplicateCategory(*category));
            }
            seen.push(*category);
        }

        let find = |wanted: Category| {
            rules
                .iter()
                .find(|(c, _)| *c == wanted)
                .map(|(_, r)| r.clone())
                .ok_or(RuleError::MissingCategory(wanted))
        };
        let payments = find(Category::Pagamentos)?;
        let income = find(Category::Receitas)?;

        Ok(Self {
            rules,
            payments,
            income,
        })
    }

    pub fn from_toml(toml_content: &str) -> Result<Self, RuleError> {
        let file: RuleFile = toml::from_str(toml_content)?;
        let rules = file
            .rules
            .into_iter()
            .map(|e| {
                let rule = CategoryRule {
                    keywords: e.keywords,
                    exceptions: e.exceptions,
                };
                (e.category, rule.normalized())
            })
            .collect();
        Self::from_rules(rules)
    }

    pub fn rules(&self) -> &[(Category, CategoryRule)] {
        &self.rules
    }

    /// Assigns exactly one category. Matching is case-insensitive substring
    /// containment; the first step that matches wins.
    pub fn categorize(&self, description: &str, amount: Amount) -> Category {
        let desc = description.to_uppercase();

        if self.payments.matches_keyword(&desc) {
            return Category::Pagamentos;
        }

        if amount.is_positive() {
            return if self.income.matches_keyword(&desc) {
                Category::Receitas
            } else {
                Category::ReceitasNaoCategorizadas
            };
        }

        let hit = self
            .rules
            .iter()
            .filter(|(c, _)| !matches!(c, Category::Pagamentos | Category::Receitas))
            .find(|(_, rule)| rule.matches(&desc))
            .map(|(c, _)| *c);
        if let Some(category) = hit {
            return category;
        }

        if amount.is_negative() {
            Category::OutrosGastos
        } else {
            Category::ReceitasNaoCategorizadas
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn amt(s: &str) -> Amount {
        Amount::new(Decimal::from_str(s).unwrap())
    }

    fn categorize(desc: &str, amount: &str) -> Category {
        CategoryRuleSet::default().categorize(desc, amt(amount))
    }

    #[test]
    fn ifood_debit_is_food() {
        assert_eq!(categorize("IFOOD DELIVERY", "-45.90"), Category::Alimentacao);
    }

    #[test]
    fn invoice_payment_overrides_sign() {
        assert_eq!(categorize("PAGAMENTO DE FATURA", "-1200.00"), Category::Pagamentos);
        assert_eq!(categorize("PAGAMENTO DE FATURA", "1200.00"), Category::Pagamentos);
    }

    #[test]
    fn payment_keyword_beats_other_keywords() {
        assert_eq!(categorize("BOLETO UBER IFOOD", "-10.00"), Category::Pagamentos);
    }

    #[test]
    fn received_transfer_is_income() {
        assert_eq!(categorize("TRANSFERÊNCIA RECEBIDA JOAO", "500.00"), Category::Receitas);
    }

    #[test]
    fn unknown_credit_is_uncategorized_income() {
        assert_eq!(categorize("PIX ESTORNO", "12.00"), Category::ReceitasNaoCategorizadas);
    }

    #[test]
    fn credit_with_expense_keyword_is_still_income_side() {
        assert_eq!(categorize("UBER REEMBOLSO", "20.00"), Category::ReceitasNaoCategorizadas);
    }

    #[test]
    fn unmatched_debit_is_other_expense() {
        assert_eq!(categorize("LOJA XYZ", "-30.00"), Category::OutrosGastos);
    }

    #[test]
    fn zero_amount_falls_back_to_uncategorized_income() {
        assert_eq!(categorize("LOJA XYZ", "0"), Category::ReceitasNaoCategorizadas);
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(categorize("Uber *Trip", "-18.40"), Category::Transporte);
        assert_eq!(categorize("aplicação rdb", "-100.00"), Category::Investimentos);
    }

    #[test]
    fn keyword_matches_inside_larger_word() {
        // "TAXI" inside "TAXIMETRO"
        assert_eq!(categorize("TAXIMETRO CENTRAL", "-25.00"), Category::Transporte);
    }

    #[test]
    fn declared_order_breaks_ties() {
        assert_eq!(categorize("IFOOD UBER", "-25.00"), Category::Alimentacao);
    }

    #[test]
    fn exceptions_block_a_match() {
        let rules = CategoryRuleSet::from_rules(vec![
            (Category::Transporte, CategoryRule::new(["UBER"], ["EATS"])),
            (Category::Alimentacao, CategoryRule::new(["UBER EATS"], NO_EXCEPTIONS)),
            (Category::Receitas, CategoryRule::new(["SALÁRIO"], NO_EXCEPTIONS)),
            (Category::Pagamentos, CategoryRule::new(["BOLETO"], NO_EXCEPTIONS)),
        ])
        .unwrap();
        assert_eq!(rules.categorize("UBER EATS", amt("-30")), Category::Alimentacao);
        assert_eq!(rules.categorize("UBER TRIP", amt("-30")), Category::Transporte);
    }

    #[test]
    fn every_result_is_in_the_closed_set() {
        let rules = CategoryRuleSet::default();
        for (desc, amount) in [("X", "-1"), ("X", "1"), ("X", "0"), ("CDB", "-1"), ("BOLETO", "0")] {
            assert!(Category::ALL.contains(&rules.categorize(desc, amt(amount))));
        }
    }

    #[test]
    fn from_toml_loads_ordered_rules() {
        let toml = r#"
            [[rule]]
            category = "TRANSPORTE"
            keywords = ["uber"]

            [[rule]]
            category = "ALIMENTAÇÃO"
            keywords = ["uber eats", "ifood"]

            [[rule]]
            category = "RECEITAS"
            keywords = ["salário"]
            exceptions = ["-"]

            [[rule]]
            category = "PAGAMENTOS"
            keywords = ["boleto"]
        "#;
        let rules = CategoryRuleSet::from_toml(toml).unwrap();
        assert_eq!(rules.rules().len(), 4);
        assert_eq!(rules.rules()[0].1.keywords, vec!["UBER"]);
        // TRANSPORTE is declared first, so it wins for "UBER EATS".
        assert_eq!(rules.categorize("UBER EATS", amt("-30")), Category::Transporte);
        assert_eq!(rules.categorize("SALÁRIO ACME", amt("3000")), Category::Receitas);
    }

    #[test]
    fn from_toml_requires_payments_and_income() {
        let toml = r#"
            [[rule]]
            category = "RECEITAS"
            keywords = ["SALÁRIO"]
        "#;
        assert!(matches!(
            CategoryRuleSet::from_toml(toml),
            Err(RuleError::MissingCategory(Category::Pagamentos))
        ));
    }

    #[test]
    fn from_toml_rejects_unknown_category() {
        let toml = r#"
            [[rule]]
            category = "LAZER"
            keywords = ["CINEMA"]
        "#;
        assert!(matches!(CategoryRuleSet::from_toml(toml), Err(RuleError::Toml(_))));
    }

    #[test]
    fn from_rules_rejects_duplicates() {
        let result = CategoryRuleSet::from_rules(vec![
            (Category::Receitas, CategoryRule::default()),
            (Category::Receitas, CategoryRule::default()),
        ]);
        assert!(matches!(result, Err(RuleError::DuplicateCategory(Category::Receitas))));
    }
}
