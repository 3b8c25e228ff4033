use ndarray::{ArrayView1, ArrayView2, Axis, Zip};

use crate::{
    error::{Result, TrainErr},
    loss::binary_cross_entropy,
};

/// Predictions at or above this value count as the positive class.
const DECISION_THRESHOLD: f64 = 0.5;

/// How well a set of predictions matches its targets.
#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    /// Cross entropy summed over targets, averaged over examples.
    pub cross_entropy: f64,
    /// Squared error summed over targets, averaged over examples.
    pub mse: f64,
    /// Coefficient of determination, `None` when every target column is constant.
    pub r2: Option<f64>,
    /// The example with the largest cross entropy.
    pub worst_cross_entropy: usize,
    /// The example with the largest squared error.
    pub worst_mse: usize,
    /// Only present when scored against a null prediction.
    pub classification: Option<ClassificationScore>,
}

/// Metrics that compare the predictions against a null model and read them as classifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationScore {
    pub log_likelihood: f64,
    pub null_log_likelihood: f64,
    /// `1 - ll / null_ll`.
    pub mcfadden_r2: f64,
    /// Per target, the mean prediction over positives minus the mean over negatives. `None` for
    /// targets with a single class.
    pub tjur_r2: Vec<Option<f64>>,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
}

/// Scores predictions of event probabilities.
///
/// # Arguments
/// * `y` - The targets, one example per row.
/// * `y_pred` - The predictions, same shape as `y`.
/// * `y_null` - The per target prediction of a null model (usually the train target means).
///   When given, the classification metrics are computed too.
/// * `eps` - Predictions are clamped to `[eps, 1 - eps]` before taking logarithms.
///
/// # Returns
/// `NothingToScore` for zero examples, `SizeMismatch` if the shapes differ.
pub fn regression_score(
    y: ArrayView2<f64>,
    y_pred: ArrayView2<f64>,
    y_null: Option<ArrayView1<f64>>,
    eps: f64,
) -> Result<Score> {
    check_shape("predictions", y_pred.dim(), y.dim())?;
    if let Some(y_null) = y_null {
        check_shape("null predictions", (y.nrows(), y_null.len()), y.dim())?;
    }

    let n = y.nrows();
    if n == 0 {
        return Err(TrainErr::NothingToScore);
    }

    let ce = Zip::from(y_pred).and(y).map_collect(|&p, &t| binary_cross_entropy(p, t, eps));
    let se = Zip::from(y_pred).and(y).map_collect(|&p, &t| (p - t).powi(2));

    let ce_rows = ce.sum_axis(Axis(1));
    let se_rows = se.sum_axis(Axis(1));
    let ll = -ce_rows.sum();
    let ss_res = se_rows.sum();

    let ss_tot: f64 = y
        .mean_axis(Axis(0))
        .map(|mean| (&y - &mean).mapv(|d| d * d).sum())
        .unwrap_or_default();
    let r2 = (ss_tot > 0.0).then(|| 1.0 - ss_res / ss_tot);

    let classification = y_null.map(|y_null| classify(y, y_pred, y_null, ll, eps));

    Ok(Score {
        cross_entropy: -ll / n as f64,
        mse: ss_res / n as f64,
        r2,
        worst_cross_entropy: argmax(ce_rows.view()),
        worst_mse: argmax(se_rows.view()),
        classification,
    })
}

fn classify(
    y: ArrayView2<f64>,
    y_pred: ArrayView2<f64>,
    y_null: ArrayView1<f64>,
    ll: f64,
    eps: f64,
) -> ClassificationScore {
    let null_log_likelihood: f64 = y
        .rows()
        .into_iter()
        .map(|row| {
            row.iter()
                .zip(y_null.iter())
                .map(|(&t, &p)| -binary_cross_entropy(p, t, eps))
                .sum::<f64>()
        })
        .sum();

    let mcfadden_r2 = if null_log_likelihood == 0.0 {
        0.0
    } else {
        1.0 - ll / null_log_likelihood
    };

    let tjur_r2 = y
        .columns()
        .into_iter()
        .zip(y_pred.columns())
        .map(|(t, p)| {
            let (mut pos, mut n_pos, mut neg, mut n_neg) = (0.0, 0, 0.0, 0);
            for (&t, &p) in t.iter().zip(p.iter()) {
                if t >= DECISION_THRESHOLD {
                    pos += p;
                    n_pos += 1;
                } else {
                    neg += p;
                    n_neg += 1;
                }
            }

            (n_pos > 0 && n_neg > 0).then(|| pos / n_pos as f64 - neg / n_neg as f64)
        })
        .collect();

    let (mut correct, mut true_pos, mut pred_pos, mut actual_pos) = (0, 0, 0, 0);
    for (&t, &p) in y.iter().zip(y_pred.iter()) {
        let actual = t >= DECISION_THRESHOLD;
        let predicted = p >= DECISION_THRESHOLD;

        correct += usize::from(actual == predicted);
        true_pos += usize::from(actual && predicted);
        pred_pos += usize::from(predicted);
        actual_pos += usize::from(actual);
    }

    let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };

    ClassificationScore {
        log_likelihood: ll,
        null_log_likelihood,
        mcfadden_r2,
        tjur_r2,
        accuracy: ratio(correct, y.len()),
        precision: ratio(true_pos, pred_pos),
        recall: ratio(true_pos, actual_pos),
    }
}

fn argmax(values: ArrayView1<f64>) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, &v)| if v > best.1 { (i, v) } else { best })
        .0
}

fn check_shape(a: &'static str, got: (usize, usize), expected: (usize, usize)) -> Result<()> {
    if got.1 != expected.1 {
        return Err(TrainErr::SizeMismatch {
            a,
            b: "target columns",
            got: got.1,
            expected: expected.1,
        });
    }

    if got.0 != expected.0 {
        return Err(TrainErr::SizeMismatch {
            a,
            b: "target rows",
            got: got.0,
            expected: expected.0,
        });
    }

    Ok(())
}
