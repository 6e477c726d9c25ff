use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::DateTime;
use common::Result;
use datafusion::arrow::array::{Int64Array, TimestampMillisecondArray};
use datafusion::arrow::datatypes::{DataType, TimeUnit};
use datafusion::common::DataFusionError;
use datafusion::logical_expr::{ColumnarValue, ScalarUDF, Volatility, create_udf};

/// Epoch-milliseconds to timestamp conversion UDF.
///
/// Values chrono cannot place on the calendar become null rather than a
/// bogus timestamp.
pub fn epoch_ms_to_timestamp() -> ScalarUDF {
    create_udf(
        "epoch_ms_to_timestamp",
        vec![DataType::Int64],
        DataType::Timestamp(TimeUnit::Millisecond, None),
        Volatility::Immutable,
        Arc::new(|args| {
            convert_to_timestamp(args).map_err(|e| DataFusionError::Internal(e.to_string()))
        }),
    )
}

/// Run-scoped songplay identifier UDF.
///
/// Ids are drawn from one atomic counter shared by every partition, so they
/// are unique and strictly increasing within a run but not necessarily
/// contiguous in row order. Volatile so the engine evaluates it once per row.
pub fn songplay_id() -> ScalarUDF {
    let counter = Arc::new(AtomicI64::new(0));
    create_udf(
        "songplay_id",
        vec![DataType::Int64],
        DataType::Int64,
        Volatility::Volatile,
        Arc::new(move |args| {
            assign_ids(&counter, args).map_err(|e| DataFusionError::Internal(e.to_string()))
        }),
    )
}

/// Converts Unix timestamps (milliseconds) to Arrow timestamps
fn convert_to_timestamp(args: &[ColumnarValue]) -> Result<ColumnarValue> {
    let int_array = match &args[0] {
        ColumnarValue::Array(array) => array
            .as_any()
            .downcast_ref::<Int64Array>()
            .ok_or_else(|| DataFusionError::Internal("Expected int64 array".to_string()))?,
        ColumnarValue::Scalar(_) => {
            return Err(
                DataFusionError::Internal("Scalar inputs not supported".to_string()).into(),
            );
        }
    };

    let result: TimestampMillisecondArray = int_array
        .iter()
        .map(|opt_ts| {
            opt_ts.and_then(|ts| {
                DateTime::from_timestamp_millis(ts).map(|dt| dt.timestamp_millis())
            })
        })
        .collect();

    Ok(ColumnarValue::Array(Arc::new(result)))
}

/// Produces one fresh id per input row; the argument only carries the row
/// count.
fn assign_ids(counter: &AtomicI64, args: &[ColumnarValue]) -> Result<ColumnarValue> {
    let num_rows = match &args[0] {
        ColumnarValue::Array(array) => array.len(),
        ColumnarValue::Scalar(_) => 1,
    };

    let result: Int64Array = (0..num_rows)
        .map(|_| Some(counter.fetch_add(1, Ordering::SeqCst)))
        .collect();

    Ok(ColumnarValue::Array(Arc::new(result)))
}
