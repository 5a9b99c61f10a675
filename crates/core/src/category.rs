use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of labels a statement transaction can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "ALIMENTAÇÃO")]
    Alimentacao,
    #[serde(rename = "TRANSPORTE")]
    Transporte,
    #[serde(rename = "CONVENIÊNCIA")]
    Conveniencia,
    #[serde(rename = "INVESTIMENTOS")]
    Investimentos,
    #[serde(rename = "RECEITAS")]
    Receitas,
    #[serde(rename = "RECEITAS NÃO CATEGORIZADAS")]
    ReceitasNaoCategorizadas,
    #[serde(rename = "PAGAMENTOS")]
    Pagamentos,
    #[serde(rename = "OUTROS GASTOS")]
    OutrosGastos,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Alimentacao,
        Category::Transporte,
        Category::Conveniencia,
        Category::Investimentos,
        Category::Receitas,
        Category::ReceitasNaoCategorizadas,
        Category::Pagamentos,
        Category::OutrosGastos,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::Alimentacao => "ALIMENTAÇÃO",
            Category::Transporte => "TRANSPORTE",
            Category::Conveniencia => "CONVENIÊNCIA",
            Category::Investimentos => "INVESTIMENTOS",
            Category::Receitas => "RECEITAS",
            Category::ReceitasNaoCategorizadas => "RECEITAS NÃO CATEGORIZADAS",
            Category::Pagamentos => "PAGAMENTOS",
            Category::OutrosGastos => "OUTROS GASTOS",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(wanted) || c.label() == wanted.to_uppercase())
            .ok_or_else(|| format!("Unknown category: '{wanted}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_round_trip_through_from_str() {
        for c in Category::ALL {
            assert_eq!(c.label().parse::<Category>().unwrap(), c);
        }
    }

    #[test]
    fn from_str_is_case_insensitive() {
        assert_eq!("alimentação".parse::<Category>().unwrap(), Category::Alimentacao);
        assert_eq!("outros gastos".parse::<Category>().unwrap(), Category::OutrosGastos);
    }

    #[test]
    fn from_str_unknown() {
        assert!("LAZER".parse::<Category>().is_err());
    }

    #[test]
    fn serde_uses_labels() {
        let json = serde_json::to_string(&Category::ReceitasNaoCategorizadas).unwrap();
        assert_eq!(json, "\"RECEITAS NÃO CATEGORIZADAS\"");
    }
}
