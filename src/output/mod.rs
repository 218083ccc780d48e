use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::File;
use std::path::Path;
use crate::controls::{Control, ControlSnapshot};
use crate::error::{PKError, PKResult};
use crate::nca::{format_value, MolarMasses, PkSummary};
use crate::session::{Categories, SessionResult};
use crate::simulation::{CohortSummary, DerivedPhysiology, Substance, TimeSeries, VirtualPatient, TIME_LABEL};
use log::info;

#[derive(Debug, Serialize)]
struct RunSummary<'a> {
    generated_at: DateTime<Utc>,
    controls: &'a ControlSnapshot,
    categories: &'a Categories,
    derived: &'a DerivedPhysiology,
    pharmacokinetics: &'a [PkSummary],
    mass_units: Vec<PkSummary>,
}

pub fn save_results<P: AsRef<Path>>(
    result: &SessionResult,
    categories: &Categories,
    molar_masses: &MolarMasses,
    output_dir: P,
) -> PKResult<()> {
    let output_path = output_dir.as_ref();

    save_time_series(&result.run.series, output_path.join("time_course.csv"))?;
    save_pk_summary(&result.summaries, output_path.join("pk_summary.csv"))?;

    let summary = RunSummary {
        generated_at: Utc::now(),
        controls: &result.run.controls,
        categories,
        derived: &result.run.derived,
        pharmacokinetics: &result.summaries,
        mass_units: mass_summaries(&result.summaries, molar_masses),
    };
    let file = File::create(output_path.join("pk_summary.json"))?;
    serde_json::to_writer_pretty(file, &summary)?;

    generate_report(result, categories, molar_masses, output_path)?;

    info!("All results saved to {:?}", output_path);
    Ok(())
}

fn mass_summaries(summaries: &[PkSummary], molar_masses: &MolarMasses) -> Vec<PkSummary> {
    summaries
        .iter()
        .filter_map(|s| s.to_mass_units(molar_masses))
        .collect()
}

pub fn save_time_series<P: AsRef<Path>>(series: &TimeSeries, path: P) -> PKResult<()> {
    let mut writer = csv::Writer::from_path(path)?;

    let substances: Vec<Substance> = series.substances().collect();
    let mut header = vec![TIME_LABEL.to_string()];
    header.extend(substances.iter().map(|s| s.label().to_string()));
    writer.write_record(&header)?;

    let columns = substances
        .iter()
        .map(|&s| {
            series
                .values(s)
                .ok_or_else(|| PKError::InvalidSeries(format!("missing {} column", s)))
        })
        .collect::<PKResult<Vec<_>>>()?;

    for (i, time) in series.times.iter().enumerate() {
        let mut record = vec![time.to_string()];
        record.extend(columns.iter().map(|values| values[i].to_string()));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

pub fn save_pk_summary<P: AsRef<Path>>(summaries: &[PkSummary], path: P) -> PKResult<()> {
    let mut writer = csv::Writer::from_path(path)?;

    writer.write_record(&[
        "SUBSTANCE", "CMAX", "UNIT", "TMAX", "TIME_UNIT", "AUC", "AUC_UNIT", "HALF_LIFE"
    ])?;

    for summary in summaries {
        writer.write_record(&[
            summary.substance.to_string(),
            summary.cmax.to_string(),
            summary.unit.to_string(),
            summary.tmax.to_string(),
            summary.time_unit.to_string(),
            summary.auc.to_string(),
            summary.auc_unit(),
            format_value(summary.half_life, 4),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

pub fn save_cohort<P: AsRef<Path>>(patients: &[VirtualPatient], path: P) -> PKResult<()> {
    let mut writer = csv::Writer::from_path(path)?;

    writer.write_record(&[
        "PATIENT_ID", "WEIGHT", "CRCL", "CMAX", "AUC", "TMAX", "HALF_LIFE"
    ])?;

    for patient in patients {
        if let Some(summary) = patient.summary(Substance::Glimepiride) {
            writer.write_record(&[
                patient.patient_id.to_string(),
                patient.controls.weight_kg.to_string(),
                patient.controls.crcl_mlmin.to_string(),
                summary.cmax.to_string(),
                summary.auc.to_string(),
                summary.tmax.to_string(),
                format_value(summary.half_life, 4),
            ])?;
        }
    }

    writer.flush()?;
    Ok(())
}

/// Markdown table of PK statistics, "N/A" for undefined half-lives.
pub fn format_pk_table(summaries: &[PkSummary]) -> String {
    let mut table = String::from(
        "| Substance | Cmax | Tmax [hr] | AUC | Half-life [hr] |\n|---|---|---|---|---|\n",
    );
    for s in summaries {
        table.push_str(&format!(
            "| {} | {:.4} {} | {:.2} | {:.4} {} | {} |\n",
            s.substance,
            s.cmax,
            s.unit,
            s.tmax,
            s.auc,
            s.auc_unit(),
            format_value(s.half_life, 2),
        ));
    }
    table
}

pub fn format_cohort_summary(summary: &CohortSummary) -> String {
    format!(
        "{} (n = {}): Cmax {:.4} ± {:.4}, AUC {:.4} ± {:.4}, Tmax {:.2} ± {:.2} hr, half-life {} ± {} hr ({} estimable)",
        summary.substance,
        summary.n_patients,
        summary.cmax_mean,
        summary.cmax_sd,
        summary.auc_mean,
        summary.auc_sd,
        summary.tmax_mean,
        summary.tmax_sd,
        format_value(summary.half_life_mean, 2),
        format_value(summary.half_life_sd, 2),
        summary.n_half_life,
    )
}

/// Generate a markdown report of the current run
pub fn generate_report<P: AsRef<Path>>(
    result: &SessionResult,
    categories: &Categories,
    molar_masses: &MolarMasses,
    output_dir: P,
) -> PKResult<()> {
    let report_path = output_dir.as_ref().join("simulation_report.md");
    let controls = &result.run.controls;
    let derived = &result.run.derived;

    let mass = mass_summaries(&result.summaries, molar_masses);
    let mass_section = if mass.is_empty() {
        String::new()
    } else {
        format!("\n## Mass-Based Units\n{}", format_pk_table(&mass))
    };

    let report_content = format!(
        r#"# Glimepiride Simulation Report

Generated: {}

## Patient
- **{}**: {}
- **{}**: {}
- **{}**: {} ({})
- **{}**: {:.3} ({})
- **{}**: {} ({})
- **{}**: {} ({})

## Derived Physiology
- Renal function fraction: {:.3}
- CYP2C9 activity fraction: {:.3}

## Pharmacokinetics
{}{}
## Files Generated
- `time_course.csv`: Plasma and urine time course
- `pk_summary.csv`: PK statistics per substance
- `pk_summary.json`: Controls, categories and PK statistics
"#,
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
        Control::DoseMg.label(), controls.dose_mg,
        Control::WeightKg.label(), controls.weight_kg,
        Control::CrclMlmin.label(), controls.crcl_mlmin, categories.renal,
        Control::CirrhosisDegree.label(), controls.cirrhosis_degree, categories.cirrhosis,
        Control::Allele1ActivityPct.label(), controls.allele1_activity_pct, categories.allele1,
        Control::Allele2ActivityPct.label(), controls.allele2_activity_pct, categories.allele2,
        derived.f_renal_function,
        derived.f_cyp2c9,
        format_pk_table(&result.summaries),
        mass_section,
    );

    std::fs::write(report_path, report_content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nca::{MeasureUnit, TimeUnit};

    fn summary(substance: Substance, half_life: Option<f64>) -> PkSummary {
        PkSummary {
            substance,
            cmax: 0.5,
            tmax: 3.0,
            auc: 4.0,
            half_life,
            lambda_z: None,
            terminal_points: 0,
            unit: substance.unit(),
            time_unit: TimeUnit::Hour,
        }
    }

    #[test]
    fn test_pk_table_marks_undefined_half_life() {
        let table = format_pk_table(&[
            summary(Substance::Glimepiride, Some(5.25)),
            summary(Substance::UrineM1M2, None),
        ]);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[2].contains("5.25"));
        assert!(lines[3].ends_with("| N/A |"));
        assert!(lines[3].contains(MeasureUnit::Micromole.symbol()));
    }

    #[test]
    fn test_csv_outputs() {
        let dir = std::env::temp_dir().join(format!("pk_explorer_output_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let series = TimeSeries::new(vec![0.0, 1.0, 2.0], TimeUnit::Hour)
            .with_column(Substance::Glimepiride, vec![0.0, 0.5, 0.25])
            .unwrap();
        save_time_series(&series, dir.join("ts.csv")).unwrap();
        save_pk_summary(&[summary(Substance::M1, None)], dir.join("pk.csv")).unwrap();

        let ts = std::fs::read_to_string(dir.join("ts.csv")).unwrap();
        assert_eq!(ts.lines().next().unwrap(), "Time [hr],Glimepiride Plasma [µM]");
        assert_eq!(ts.lines().count(), 4);

        let pk = std::fs::read_to_string(dir.join("pk.csv")).unwrap();
        assert!(pk.lines().nth(1).unwrap().ends_with(",N/A"));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
