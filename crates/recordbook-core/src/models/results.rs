use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectResult {
    pub code: String,
    pub name: String,
    pub credits: u32,
    pub grade: String,
    #[serde(default)]
    pub grade_points: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterResult {
    pub semester: u8,
    #[serde(default)]
    pub sgpa: Option<f32>,
    #[serde(default)]
    pub subjects: Vec<SubjectResult>,
}

impl SemesterResult {
    pub fn credits(&self) -> u32 {
        self.subjects.iter().map(|s| s.credits).sum()
    }

    fn weighted_points(&self) -> f32 {
        self.subjects
            .iter()
            .map(|s| s.grade_points * s.credits as f32)
            .sum()
    }

    /// SGPA as published, or computed from subject grades when missing.
    pub fn effective_sgpa(&self) -> Option<f32> {
        self.sgpa.or_else(|| {
            let credits = self.credits();
            (credits > 0).then(|| self.weighted_points() / credits as f32)
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultsSheet {
    pub cgpa: Option<f32>,
    pub semesters: Vec<SemesterResult>,
}

impl ResultsSheet {
    /// CGPA as published, falling back to a credit-weighted average.
    pub fn effective_cgpa(&self) -> Option<f32> {
        if self.cgpa.is_some() {
            return self.cgpa;
        }
        let credits: u32 = self.semesters.iter().map(|s| s.credits()).sum();
        if credits == 0 {
            return None;
        }
        let points: f32 = self.semesters.iter().map(|s| s.weighted_points()).sum();
        Some(points / credits as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject(credits: u32, points: f32) -> SubjectResult {
        SubjectResult {
            code: "CS101".to_string(),
            name: "Programming".to_string(),
            credits,
            grade: "A".to_string(),
            grade_points: points,
        }
    }

    #[test]
    fn test_effective_cgpa_falls_back_to_weighted_average() {
        let sheet = ResultsSheet {
            cgpa: None,
            semesters: vec![SemesterResult {
                semester: 1,
                sgpa: None,
                subjects: vec![subject(4, 10.0), subject(2, 7.0)],
            }],
        };
        assert_eq!(sheet.effective_cgpa(), Some(9.0));
        assert_eq!(sheet.semesters[0].effective_sgpa(), Some(9.0));
        assert_eq!(ResultsSheet::default().effective_cgpa(), None);
    }
}
