use arrow::{
    array::{ArrayRef, Float64Array, Int64Array, StringArray},
    error::ArrowError,
    record_batch::RecordBatch,
};
use std::sync::Arc;

use super::row::FlatRow;
use crate::schema::flat_row_schema;

/// Build one RecordBatch from `rows`, columns in `FLAT_COLUMNS` order.
pub fn rows_to_record_batch(rows: &[&FlatRow]) -> Result<RecordBatch, ArrowError> {
    let columns: Vec<ArrayRef> = vec![
        text_column(rows, |r| &r.name_common),
        text_column(rows, |r| &r.name_official),
        text_column(rows, |r| &r.region),
        text_column(rows, |r| &r.subregion),
        text_column(rows, |r| &r.capital),
        Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.population))),
        Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.area))),
        text_column(rows, |r| &r.currency_code),
        text_column(rows, |r| &r.currency_name),
        text_column(rows, |r| &r.language),
    ];

    RecordBatch::try_new(flat_row_schema(), columns)
}

fn text_column(rows: &[&FlatRow], field: fn(&FlatRow) -> &String) -> ArrayRef {
    Arc::new(
        rows.iter()
            .map(|r| Some(field(r).as_str()))
            .collect::<StringArray>(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::row::NOT_AVAILABLE;
    use arrow::array::Array;

    #[test]
    fn test_rows_to_record_batch() {
        let row = FlatRow {
            name_common: "Testland".into(),
            name_official: "Republic of Testland".into(),
            region: "TestRegion".into(),
            subregion: "TestSub".into(),
            capital: "TestCity".into(),
            population: 1000,
            area: 50.5,
            currency_code: "TST".into(),
            currency_name: "Test Dollar".into(),
            language: NOT_AVAILABLE.into(),
        };
        let batch = rows_to_record_batch(&[&row, &row]).unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), 10);

        let pop = batch
            .column(5)
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap();
        assert_eq!(pop.value(0), 1000);
        let lang = batch
            .column(9)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(lang.value(1), "N/A");
        assert_eq!(lang.null_count(), 0);
    }

    #[test]
    fn test_empty_batch() {
        let batch = rows_to_record_batch(&[]).unwrap();
        assert_eq!(batch.num_rows(), 0);
    }
}
