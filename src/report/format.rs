//! String builders for terminal output. No I/O here.

use crate::domain::{
    Baseline, CoefficientBatch, DesignParams, Recommendation, Sample, SmokeYields,
};
use crate::fit::FitOutcome;

/// Format the outcome of a regression refit.
pub fn format_fit_summary(outcome: &FitOutcome) -> String {
    let mut out = String::new();
    out.push_str("=== auxfit - regression refit ===\n");
    out.push_str(&format!("Group: {}\n", outcome.group));
    out.push_str(&format!("Batch: {}\n", outcome.batch));
    out.push_str(&format!("Samples: {}\n", outcome.n_samples));
    out.push('\n');
    out.push_str(&format_coefficients(&outcome.coefficients));
    out
}

/// Format one coefficient batch as a table: one line per response.
pub fn format_coefficients(batch: &CoefficientBatch) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Coefficients (batch {}):\n  {:<10} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12}\n",
        batch.batch,
        "response",
        "intercept",
        "ventilation",
        "press.drop",
        "permeability",
        "basis wt",
        "citrate",
    ));
    for set in batch.sets() {
        let c = set.coefficients;
        out.push_str(&format!(
            "  {:<10} {:>12.6} {:>12.6} {:>12.6} {:>12.6} {:>12.6} {:>12.6}\n",
            set.response.display_name(),
            set.intercept,
            c[0],
            c[1],
            c[2],
            c[3],
            c[4],
        ));
    }
    out
}

/// Format a scaled prediction next to its baseline.
pub fn format_prediction(
    baseline: &Baseline,
    candidate: DesignParams,
    predicted: SmokeYields,
) -> String {
    let mut out = String::new();
    out.push_str("=== auxfit - scaled prediction ===\n");
    out.push_str(&format!(
        "Candidate: {}\n",
        format_params_inline(candidate)
    ));
    out.push_str(&format!(
        "Baseline measured: tar={:.2} nicotine={:.2} CO={:.2}\n",
        baseline.measured.tar, baseline.measured.nicotine, baseline.measured.co
    ));
    out.push_str(&format!(
        "Predicted yields:  tar={:.2} nicotine={:.2} CO={:.2}\n",
        predicted.tar, predicted.nicotine, predicted.co
    ));
    out
}

/// Format ranked recommendations as a table.
pub fn format_recommendations(recommendations: &[Recommendation]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:>4}  {:>11} {:>11} {:>12} {:>9} {:>8}  {:>7} {:>9} {:>7}  {:>9}\n",
        "rank",
        "vent(%)",
        "press.drop",
        "permeability",
        "basis wt",
        "citr(%)",
        "tar",
        "nicotine",
        "CO",
        "score",
    ));
    for (rank, rec) in recommendations.iter().enumerate() {
        let p = rec.params;
        let y = rec.predicted;
        out.push_str(&format!(
            "{:>4}  {:>11.2} {:>11.1} {:>12.2} {:>9.2} {:>8.3}  {:>7.2} {:>9.2} {:>7.2}  {:>9.6}\n",
            rank + 1,
            p.filter_ventilation,
            p.filter_pressure_drop,
            p.permeability,
            p.basis_weight,
            p.citrate,
            y.tar,
            y.nicotine,
            y.co,
            rec.score,
        ));
    }
    out
}

/// Format a sample listing, newest first (store order).
pub fn format_samples(group: &str, samples: &[Sample]) -> String {
    let mut out = String::new();
    out.push_str(&format!("Group '{group}': {} sample(s)\n", samples.len()));
    out.push_str(&format!(
        "{:>6}  {:<12} {:>9} {:>11} {:>12} {:>9} {:>8}  {:>7} {:>9} {:>7}\n",
        "id",
        "code",
        "vent",
        "press.drop",
        "permeability",
        "basis wt",
        "citrate",
        "tar",
        "nicotine",
        "CO",
    ));
    for s in samples {
        let p = s.params;
        let y = s.yields;
        out.push_str(&format!(
            "{:>6}  {:<12} {:>9.2} {:>11.1} {:>12.2} {:>9.2} {:>8.3}  {:>7.2} {:>9.2} {:>7.2}\n",
            s.id,
            s.code,
            p.filter_ventilation,
            p.filter_pressure_drop,
            p.permeability,
            p.basis_weight,
            p.citrate,
            y.tar,
            y.nicotine,
            y.co,
        ));
    }
    out
}

fn format_params_inline(p: DesignParams) -> String {
    format!(
        "vent={:.2}% pd={:.1} perm={:.2} bw={:.2} citr={:.3}%",
        p.filter_ventilation, p.filter_pressure_drop, p.permeability, p.basis_weight, p.citrate
    )
}
