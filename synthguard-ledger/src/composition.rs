use serde::{Deserialize, Serialize};

/// How a ledger turns its accepted entries into one effective ε.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum CompositionMethod {
    /// Arithmetic sum of every entry.
    #[default]
    Sequential,
    /// Advanced composition at failure probability `delta`.
    Advanced { delta: f64 },
    /// Rényi accounting over `orders`, converted to (ε, `delta`).
    Renyi { orders: Vec<f64>, delta: f64 },
}

/// Method that actually produced a reported figure.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AccountingMethod {
    #[default]
    Sequential,
    Advanced,
    Renyi,
}

impl AccountingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountingMethod::Sequential => "sequential",
            AccountingMethod::Advanced => "advanced",
            AccountingMethod::Renyi => "renyi",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Composed {
    pub epsilon: f64,
    pub method: AccountingMethod,
}

impl CompositionMethod {
    pub fn renyi_default() -> Self {
        CompositionMethod::Renyi {
            orders: vec![1.5, 2.0, 3.0, 4.0, 8.0, 16.0, 32.0, 64.0],
            delta: 1e-5,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            CompositionMethod::Sequential => Ok(()),
            CompositionMethod::Advanced { delta } => validate_delta(*delta),
            CompositionMethod::Renyi { orders, delta } => {
                validate_delta(*delta)?;
                if orders.is_empty() {
                    return Err("renyi accounting needs at least one order".into());
                }
                match orders.iter().find(|alpha| !(alpha.is_finite() && **alpha > 1.0)) {
                    Some(alpha) => Err(format!("renyi order {alpha} must be finite and > 1")),
                    None => Ok(()),
                }
            }
        }
    }

    /// Effective ε of `epsilons` (accepted entries). Advanced and Rényi
    /// figures never exceed the sequential sum; the sum is reported instead
    /// whenever it is tighter.
    pub fn accumulate(&self, epsilons: &[f64]) -> Composed {
        let sequential = Composed {
            epsilon: epsilons.iter().sum(),
            method: AccountingMethod::Sequential,
        };
        if epsilons.is_empty() {
            return sequential;
        }
        let candidate = match self {
            CompositionMethod::Sequential => return sequential,
            CompositionMethod::Advanced { delta } => Composed {
                epsilon: advanced_bound(epsilons, *delta),
                method: AccountingMethod::Advanced,
            },
            CompositionMethod::Renyi { orders, delta } => Composed {
                epsilon: renyi_bound(epsilons, orders, *delta),
                method: AccountingMethod::Renyi,
            },
        };
        if candidate.epsilon.is_finite() && candidate.epsilon < sequential.epsilon {
            candidate
        } else {
            sequential
        }
    }
}

fn validate_delta(delta: f64) -> Result<(), String> {
    if delta > 0.0 && delta < 1.0 {
        Ok(())
    } else {
        Err(format!("delta {delta} must lie in (0, 1)"))
    }
}

/// `√(2k·ln(1/δ))·ε* + k·ε*·(e^{ε*} − 1)` with ε* the largest entry.
fn advanced_bound(epsilons: &[f64], delta: f64) -> f64 {
    let k = epsilons.len() as f64;
    let largest = epsilons.iter().copied().fold(0.0, f64::max);
    (2.0 * k * (1.0 / delta).ln()).sqrt() * largest + k * largest * largest.exp_m1()
}

/// `min over α of RDP(α) + ln(1/δ)/(α − 1)`, where each ε-DP entry costs
/// `min(ε, α·ε²/2)` at order α.
fn renyi_bound(epsilons: &[f64], orders: &[f64], delta: f64) -> f64 {
    let log_inverse_delta = (1.0 / delta).ln();
    orders
        .iter()
        .map(|&alpha| {
            let rdp: f64 = epsilons
                .iter()
                .map(|&epsilon| epsilon.min(alpha * epsilon * epsilon / 2.0))
                .sum();
            rdp + log_inverse_delta / (alpha - 1.0)
        })
        .fold(f64::INFINITY, f64::min)
}
