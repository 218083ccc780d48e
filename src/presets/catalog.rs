use super::{PresetAxis, PresetTable};
use crate::controls::ControlSnapshot;

/// Static preset tables plus the read-only clinical example profiles.
#[derive(Debug, Clone)]
pub struct PresetCatalog {
    renal: PresetTable,
    cirrhosis: PresetTable,
    allele: PresetTable,
    examples: Vec<(String, ControlSnapshot)>,
}

impl PresetCatalog {
    pub fn new() -> Self {
        let renal = PresetTable::new(vec![
            ("Normal function", 110.0),
            ("Mild impairment", 69.0),
            ("Moderate impairment", 32.0),
            ("Severe impairment", 19.0),
        ]);

        // Child-Turcotte-Pugh stages
        let cirrhosis = PresetTable::new(vec![
            ("Control", 0.0),
            ("Mild cirrhosis (CTP A)", 1.0 / 3.0),
            ("Moderate cirrhosis (CTP B)", 2.0 / 3.0),
            ("Severe cirrhosis (CTP C)", 5.0 / 6.0),
        ]);

        let allele = PresetTable::new(vec![
            ("*1", 100.0),
            ("*2", 63.0),
            ("*3", 21.0),
        ]);

        let examples = build_examples(&renal, &cirrhosis, &allele);

        Self {
            renal,
            cirrhosis,
            allele,
            examples,
        }
    }

    pub fn table(&self, axis: PresetAxis) -> &PresetTable {
        match axis {
            PresetAxis::Renal => &self.renal,
            PresetAxis::Cirrhosis => &self.cirrhosis,
            PresetAxis::Allele => &self.allele,
        }
    }

    pub fn example_profiles(&self) -> &[(String, ControlSnapshot)] {
        &self.examples
    }

    pub fn example_profile(&self, name: &str) -> Option<&ControlSnapshot> {
        self.examples
            .iter()
            .find(|(example, _)| example == name)
            .map(|(_, snapshot)| snapshot)
    }

    pub fn is_example(&self, name: &str) -> bool {
        self.example_profile(name).is_some()
    }
}

impl Default for PresetCatalog {
    fn default() -> Self {
        Self::new()
    }
}

fn build_examples(
    renal: &PresetTable,
    cirrhosis: &PresetTable,
    allele: &PresetTable,
) -> Vec<(String, ControlSnapshot)> {
    let reference = ControlSnapshot::default();
    let mut examples = Vec::new();

    for &(name, degree) in cirrhosis.entries().iter().skip(1) {
        examples.push((
            name.to_string(),
            ControlSnapshot { cirrhosis_degree: degree, ..reference },
        ));
    }

    for &(name, crcl) in renal.entries().iter().skip(1) {
        examples.push((
            format!("Renal: {}", name),
            ControlSnapshot { crcl_mlmin: crcl, ..reference },
        ));
    }

    // Genotype pairs in table order, *1/*1 being the reference patient
    let alleles = allele.entries();
    for (i, &(first, a1)) in alleles.iter().enumerate() {
        for &(second, a2) in &alleles[i..] {
            examples.push((
                format!("CYP2C9 {}/{}", first, second),
                ControlSnapshot {
                    allele1_activity_pct: a1,
                    allele2_activity_pct: a2,
                    ..reference
                },
            ));
        }
    }

    examples
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_unique_per_axis() {
        let catalog = PresetCatalog::new();
        for axis in [PresetAxis::Renal, PresetAxis::Cirrhosis, PresetAxis::Allele] {
            let table = catalog.table(axis);
            let mut names: Vec<_> = table.names().collect();
            names.sort();
            names.dedup();
            assert_eq!(names.len(), table.len(), "duplicate preset name on {}", axis);
        }
    }

    #[test]
    fn test_example_profiles() {
        let catalog = PresetCatalog::new();
        let examples = catalog.example_profiles();

        // 3 cirrhosis stages, 3 renal stages, 6 genotype pairs
        assert_eq!(examples.len(), 12);

        let poor = catalog.example_profile("CYP2C9 *3/*3").unwrap();
        assert_eq!(poor.allele1_activity_pct, 21.0);
        assert_eq!(poor.allele2_activity_pct, 21.0);
        assert_eq!(poor.dose_mg, 4.0);

        let severe = catalog.example_profile("Renal: Severe impairment").unwrap();
        assert_eq!(severe.crcl_mlmin, 19.0);
        assert!(catalog.is_example("Moderate cirrhosis (CTP B)"));
        assert!(!catalog.is_example("Control"));
    }
}
