use std::collections::{BTreeSet, HashMap};

use log::{debug, warn};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use super::error::ClassifierError;
use super::model::LinearClassifier;
use super::utils::softmax_in_place;

/// Hyperparameters for [`LogisticRegression`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegressionParams {
    /// Upper bound on gradient steps
    pub max_iter: usize,
    /// Inverse L2 regularization strength; smaller values regularize more
    pub c: f64,
    /// Stop once every gradient entry is below this in absolute value
    pub tol: f64,
}

impl Default for LogisticRegressionParams {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            c: 1.0,
            tol: 1e-4,
        }
    }
}

impl LogisticRegressionParams {
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    fn validate(&self) -> Result<(), ClassifierError> {
        if self.max_iter == 0 {
            return Err(ClassifierError::ValidationError("max_iter must be positive".into()));
        }
        if !(self.c.is_finite() && self.c > 0.0) {
            return Err(ClassifierError::ValidationError("C must be a positive number".into()));
        }
        if !(self.tol.is_finite() && self.tol >= 0.0) {
            return Err(ClassifierError::ValidationError("tol must be non-negative".into()));
        }
        Ok(())
    }
}

/// Multinomial (softmax) logistic regression with intercepts and an L2 penalty.
///
/// Minimizes `mean cross-entropy + ||W||² / (2·C·n)` with Nesterov-accelerated
/// gradient descent. Classes are kept in sorted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    classes: Vec<String>,
    /// Shape `(n_classes, n_features)`
    coefficients: Array2<f64>,
    intercepts: Array1<f64>,
    n_iter: usize,
}

impl LogisticRegression {
    fn probabilities(&self, x: &Array2<f64>, w: &Array2<f64>, b: &Array1<f64>) -> Array2<f64> {
        let mut logits = x.dot(&w.t()) + b;
        for row in logits.rows_mut() {
            softmax_in_place(row);
        }
        logits
    }
}

fn check_finite<'a>(values: impl IntoIterator<Item = &'a f32>) -> Result<(), ClassifierError> {
    if values.into_iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(ClassifierError::ValidationError("Features contain NaN or infinite values".into()))
    }
}

impl LinearClassifier for LogisticRegression {
    type Params = LogisticRegressionParams;

    fn fit(
        params: &Self::Params,
        features: ArrayView2<'_, f32>,
        labels: &[String],
    ) -> Result<Self, ClassifierError> {
        params.validate()?;
        let (n_samples, n_features) = features.dim();
        if n_samples == 0 || n_features == 0 {
            return Err(ClassifierError::ValidationError("Feature matrix is empty".into()));
        }
        if n_samples != labels.len() {
            return Err(ClassifierError::ValidationError(format!(
                "Got {} feature rows but {} labels",
                n_samples,
                labels.len()
            )));
        }
        check_finite(features.iter())?;

        let classes: Vec<String> = labels.iter().cloned().collect::<BTreeSet<_>>().into_iter().collect();
        if classes.len() < 2 {
            return Err(ClassifierError::InsufficientClasses(classes.len()));
        }
        let n_classes = classes.len();
        let index: HashMap<&str, usize> =
            classes.iter().enumerate().map(|(i, c)| (c.as_str(), i)).collect();

        let x = features.mapv(f64::from);
        let mut targets = Array2::<f64>::zeros((n_samples, n_classes));
        for (row, label) in labels.iter().enumerate() {
            targets[[row, index[label.as_str()]]] = 1.0;
        }

        let n = n_samples as f64;
        let lambda = 1.0 / (params.c * n);
        // The softmax Hessian is bounded by 1/2, so the loss gradient is
        // Lipschitz with constant 0.5 * mean(||x||² + 1) + lambda.
        let mean_sq_norm = x.rows().into_iter().map(|r| r.dot(&r) + 1.0).sum::<f64>() / n;
        let step = 1.0 / (0.5 * mean_sq_norm + lambda);

        let mut model = LogisticRegression {
            classes,
            coefficients: Array2::zeros((n_classes, n_features)),
            intercepts: Array1::zeros(n_classes),
            n_iter: 0,
        };
        let mut prev_w = model.coefficients.clone();
        let mut prev_b = model.intercepts.clone();
        let mut converged = false;

        for iter in 1..=params.max_iter {
            let momentum = (iter as f64 - 1.0) / (iter as f64 + 2.0);
            let look_w = &model.coefficients + &((&model.coefficients - &prev_w) * momentum);
            let look_b = &model.intercepts + &((&model.intercepts - &prev_b) * momentum);

            let residual = model.probabilities(&x, &look_w, &look_b) - &targets;
            let grad_w = residual.t().dot(&x) / n + &look_w * lambda;
            let grad_b = residual.sum_axis(Axis(0)) / n;

            prev_w = std::mem::replace(&mut model.coefficients, &look_w - &(&grad_w * step));
            prev_b = std::mem::replace(&mut model.intercepts, &look_b - &(&grad_b * step));
            model.n_iter = iter;

            let max_grad = grad_w
                .iter()
                .chain(grad_b.iter())
                .fold(0.0f64, |acc, g| acc.max(g.abs()));
            if max_grad < params.tol {
                converged = true;
                break;
            }
        }

        if converged {
            debug!("Logistic regression converged after {} iterations", model.n_iter);
        } else {
            warn!(
                "Logistic regression stopped at max_iter={} before reaching tol={}",
                params.max_iter, params.tol
            );
        }
        Ok(model)
    }

    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        self.coefficients.ncols()
    }

    fn predict_proba(&self, features: &[f32]) -> Result<Array1<f64>, ClassifierError> {
        if features.len() != self.n_features() {
            return Err(ClassifierError::DimensionMismatch {
                expected: self.n_features(),
                actual: features.len(),
            });
        }
        check_finite(features)?;

        let x: Array1<f64> = features.iter().map(|&v| f64::from(v)).collect();
        let mut logits = self.coefficients.dot(&x) + &self.intercepts;
        softmax_in_place(logits.view_mut());
        Ok(logits)
    }
}
