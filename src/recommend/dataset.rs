use std::{
    collections::HashMap,
    io::{BufReader, Read, Seek},
    path::Path,
};

use anyhow::Context;
use calamine::{Reader, Xlsx};
use tracing::info;

const REQUIRED_COLUMNS: [&str; 6] = [
    "condition",
    "age",
    "severity",
    "yoga_pose",
    "exercise",
    "ayurveda_tip",
];

/// One row of the recommendation table. Text columns used for matching are
/// trimmed and lower-cased at load time.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetRow {
    pub condition: String,
    pub age: Option<f64>,
    pub severity: String,
    pub yoga_pose: String,
    pub exercise: String,
    pub ayurveda_tip: String,
    pub gender: Option<String>,
    pub activity_level: Option<String>,
    pub bmi_category: Option<String>,
    pub time_available: Option<f64>,
    pub has_bp: bool,
    pub has_diabetes: bool,
}

/// Read-only recommendation table, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    rows: Vec<DatasetRow>,
}

impl Dataset {
    /// Reads `.xlsx` workbooks (first sheet) by extension, anything else as
    /// CSV.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let is_xlsx = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("xlsx"));

        let file = std::fs::File::open(path)
            .with_context(|| format!("open dataset {}", path.display()))?;
        let dataset = if is_xlsx {
            Self::from_xlsx_reader(BufReader::new(file))
        } else {
            Self::from_reader(file)
        }
        .with_context(|| format!("parse dataset {}", path.display()))?;

        info!(path = %path.display(), rows = dataset.len(), "dataset loaded");
        Ok(dataset)
    }

    /// CSV with a header row.
    pub fn from_reader<R: Read>(reader: R) -> anyhow::Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let header: Vec<String> = rdr
            .headers()
            .context("read header row")?
            .iter()
            .map(str::to_string)
            .collect();

        let mut records = Vec::new();
        for (line, record) in rdr.records().enumerate() {
            let record = record.with_context(|| format!("read row {}", line + 1))?;
            records.push(record.iter().map(str::to_string).collect());
        }
        Self::from_table(&header, &records)
    }

    /// Workbook whose first sheet holds the table, header row first.
    pub fn from_xlsx_reader<R: Read + Seek>(reader: R) -> anyhow::Result<Self> {
        let mut workbook: Xlsx<R> = Xlsx::new(reader).context("open workbook")?;
        let range = workbook
            .worksheet_range_at(0)
            .context("workbook has no sheets")?
            .context("read first sheet")?;

        let mut rows = range
            .rows()
            .map(|cells| cells.iter().map(|c| c.to_string()).collect::<Vec<String>>());
        let header = rows.next().context("read header row")?;
        let records: Vec<Vec<String>> = rows.collect();
        Self::from_table(&header, &records)
    }

    fn from_table(header: &[String], records: &[Vec<String>]) -> anyhow::Result<Self> {
        let columns: HashMap<String, usize> = header
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().to_lowercase(), i))
            .collect();

        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|c| !columns.contains_key(*c))
            .collect();
        anyhow::ensure!(missing.is_empty(), "missing columns: {}", missing.join(", "));

        let rows = records
            .iter()
            .map(|record| {
                let row = RowReader {
                    columns: &columns,
                    record,
                };
                DatasetRow {
                    condition: row.lower("condition").unwrap_or_default(),
                    age: row.number("age"),
                    severity: row.lower("severity").unwrap_or_default(),
                    yoga_pose: row.text("yoga_pose"),
                    exercise: row.text("exercise"),
                    ayurveda_tip: row.text("ayurveda_tip"),
                    gender: row.lower("gender"),
                    activity_level: row.lower("activity_level"),
                    bmi_category: row.lower("bmi_category"),
                    time_available: row.number("time_available"),
                    has_bp: row.flag("has_bp"),
                    has_diabetes: row.flag("has_diabetes"),
                }
            })
            .collect();

        Ok(Self { rows })
    }

    pub fn from_rows(rows: Vec<DatasetRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[DatasetRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

struct RowReader<'a> {
    columns: &'a HashMap<String, usize>,
    record: &'a [String],
}

impl<'a> RowReader<'a> {
    fn get(&self, name: &str) -> Option<&'a str> {
        self.columns
            .get(name)
            .and_then(|&i| self.record.get(i))
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn text(&self, name: &str) -> String {
        self.get(name).unwrap_or_default().to_string()
    }

    fn lower(&self, name: &str) -> Option<String> {
        self.get(name).map(str::to_lowercase)
    }

    /// Non-numeric values become `None`.
    fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(|v| v.parse::<f64>().ok())
    }

    fn flag(&self, name: &str) -> bool {
        self.get(name)
            .map(|v| v.eq_ignore_ascii_case("true") || v.parse::<f64>().map_or(false, |n| n == 1.0))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_headers_and_values() {
        let csv = " Condition ,AGE,Severity,yoga_pose,exercise,ayurveda_tip,Activity_Level,time_available,has_bp\n\
                   \" Stress \",30,MILD,shavasana.jpg,walking.jpg,green_tea.jpg, Active ,15,1\n\
                   migraine,abc,severe,balasana.jpg,stretching.jpg,ginger_tea.jpg,,,0\n";
        let ds = Dataset::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(ds.len(), 2);

        let first = &ds.rows()[0];
        assert_eq!(first.condition, "stress");
        assert_eq!(first.severity, "mild");
        assert_eq!(first.age, Some(30.0));
        assert_eq!(first.activity_level.as_deref(), Some("active"));
        assert_eq!(first.time_available, Some(15.0));
        assert!(first.has_bp);
        assert!(!first.has_diabetes);

        let second = &ds.rows()[1];
        assert_eq!(second.age, None);
        assert_eq!(second.activity_level, None);
        assert!(!second.has_bp);
    }

    #[test]
    fn rejects_missing_required_columns() {
        let csv = "condition,age,severity,yoga_pose\nstress,30,mild,shavasana.jpg\n";
        let err = Dataset::from_reader(csv.as_bytes()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("exercise"));
        assert!(msg.contains("ayurveda_tip"));
    }

    #[test]
    fn reads_xlsx_workbooks_like_csv() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/data/fixtures/wellness_sample.xlsx");
        let ds = Dataset::load(path).unwrap();
        assert_eq!(ds.len(), 2);

        let first = &ds.rows()[0];
        assert_eq!(first.condition, "stress");
        assert_eq!(first.severity, "mild");
        assert_eq!(first.age, Some(30.0));
        assert_eq!(first.activity_level.as_deref(), Some("active"));
        assert_eq!(first.time_available, Some(15.0));
        assert!(first.has_bp);

        let second = &ds.rows()[1];
        assert_eq!(second.condition, "migraine");
        assert_eq!(second.age, Some(45.0));
        assert_eq!(second.time_available, None);
        assert_eq!(second.activity_level, None);
        assert!(!second.has_bp);
    }

    #[test]
    fn csv_is_the_default_for_other_extensions() {
        let dir = std::env::temp_dir().join(format!("wellness-ds-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("table.data");
        std::fs::write(
            &path,
            "condition,age,severity,yoga_pose,exercise,ayurveda_tip\nstress,30,mild,a.jpg,b.jpg,c.jpg\n",
        )
        .unwrap();
        assert_eq!(Dataset::load(&path).unwrap().len(), 1);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
