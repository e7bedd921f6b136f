use serde::{Deserialize, Serialize};

/// How the hard minibatch budget of a run is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetSpec {
    /// An explicit maximum amount of minibatches.
    Minibatches { max_minibatches: u64 },
    /// Derived from a dataset epoch budget: `epochs * dataset_size / batch_size`.
    Epochs {
        epochs: u64,
        dataset_size: u64,
        batch_size: u64,
    },
}

/// The specification for the early-stopping coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordinatorSpec {
    pub budget: BudgetSpec,
    pub patience: usize,
    pub validation_interval: u64,
}

impl Default for CoordinatorSpec {
    fn default() -> Self {
        Self {
            budget: BudgetSpec::Epochs {
                epochs: 5000,
                dataset_size: 1998,
                batch_size: 10,
            },
            patience: 10,
            validation_interval: 370,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_explicit_budget() {
        let json = r#"{
            "budget": { "minibatches": { "max_minibatches": 999 } },
            "patience": 3,
            "validation_interval": 10
        }"#;

        let spec: CoordinatorSpec = serde_json::from_str(json).unwrap();
        assert_eq!(
            spec.budget,
            BudgetSpec::Minibatches {
                max_minibatches: 999
            }
        );
        assert_eq!(spec.patience, 3);
        assert_eq!(spec.validation_interval, 10);
    }
}
