pub mod surrogate;

use crate::error::{PKError, PKResult};

pub use surrogate::SurrogateModel;

// Parameter names understood by the glimepiride whole-body model.
pub const PARAM_DOSE: &str = "PODOSE_gli";
pub const PARAM_BODY_WEIGHT: &str = "BW";
pub const PARAM_CIRRHOSIS: &str = "f_cirrhosis";
pub const PARAM_RENAL_FUNCTION: &str = "KI__f_renal_function";
pub const PARAM_CYP2C9: &str = "f_cyp2c9";

/// Time-course selection requested from the simulator, time first.
pub const TIME_COURSE_SELECTIONS: [&str; 5] =
    ["time", "[Cve_gli]", "[Cve_m1]", "[Cve_m2]", "Aurine_m1_m2"];

/// Stateful model integrator. One instance per session; reset before every run.
pub trait Simulator {
    fn reset(&mut self);
    fn set_parameter(&mut self, name: &str, value: f64) -> PKResult<()>;
    /// Simulates `steps` intervals between `start` and `end` (model time, minutes).
    fn simulate(&mut self, start: f64, end: f64, steps: usize) -> PKResult<RawSeries>;
}

impl<S: Simulator + ?Sized> Simulator for Box<S> {
    fn reset(&mut self) {
        (**self).reset()
    }

    fn set_parameter(&mut self, name: &str, value: f64) -> PKResult<()> {
        (**self).set_parameter(name, value)
    }

    fn simulate(&mut self, start: f64, end: f64, steps: usize) -> PKResult<RawSeries> {
        (**self).simulate(start, end, steps)
    }
}

/// Simulator output in native model units.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSeries {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl RawSeries {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<f64>) -> PKResult<()> {
        if row.len() != self.columns.len() {
            return Err(PKError::Simulation(format!(
                "Row has {} values but {} columns are selected",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| row[idx]).collect())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
