//! Save a daily raster to a parquet file, one row per cell.

use std::{path::Path, sync::Arc};

use anyhow::{ensure, Result};
use arrow::{
    array::{ArrayRef, Date32Builder, Float32Builder, Float64Builder, UInt32Builder},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use chrono::{Datelike, NaiveDate};
use parquet::{
    arrow::ArrowWriter,
    basic::{Compression, ZstdLevel},
    file::properties::WriterProperties,
    format::KeyValue,
};

use crate::{atomic::write_atomically, raster::Grid};

const CHUNK_SIZE: usize = 100_000;

/// A named column of cell values laid out on the grid, `NaN` for no-data.
pub struct Layer<'a> {
    pub name: &'a str,
    pub values: &'a [f32],
}

/// Writes `layers` for `date` in long format: `date`, `row`, `col`, `lat`,
/// `lon`, then one nullable `Float32` column per layer. The grid is stored in
/// the file metadata under `lwf.*` keys.
pub fn save_raster(file_path: &Path, date: NaiveDate, grid: &Grid, layers: &[Layer]) -> Result<()> {
    for layer in layers {
        ensure!(
            layer.values.len() == grid.len(),
            "Layer `{}` has {} cells, grid has {}",
            layer.name,
            layer.values.len(),
            grid.len()
        );
    }

    let mut fields = vec![
        Field::new("date", DataType::Date32, false),
        Field::new("row", DataType::UInt32, false),
        Field::new("col", DataType::UInt32, false),
        Field::new("lat", DataType::Float64, false),
        Field::new("lon", DataType::Float64, false),
    ];
    fields.extend(
        layers
            .iter()
            .map(|layer| Field::new(layer.name, DataType::Float32, true)),
    );
    let schema = Arc::new(Schema::new(fields));

    let props = WriterProperties::builder()
        .set_compression(Compression::ZSTD(ZstdLevel::default()))
        .set_key_value_metadata(Some(grid_metadata(grid)))
        .build();

    let date32 = days_since_epoch(date);

    write_atomically(file_path, |file| {
        let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;

        let mut start = 0;
        while start < grid.len() {
            let end = (start + CHUNK_SIZE).min(grid.len());
            let batch = make_batch(&schema, grid, date32, layers, start..end)?;
            writer.write(&batch)?;
            start = end;
        }

        writer.close()?;
        Ok(())
    })
}

fn make_batch(
    schema: &Arc<Schema>,
    grid: &Grid,
    date32: i32,
    layers: &[Layer],
    cells: std::ops::Range<usize>,
) -> Result<RecordBatch> {
    let len = cells.len();
    let mut date_builder = Date32Builder::with_capacity(len);
    let mut row_builder = UInt32Builder::with_capacity(len);
    let mut col_builder = UInt32Builder::with_capacity(len);
    let mut lat_builder = Float64Builder::with_capacity(len);
    let mut lon_builder = Float64Builder::with_capacity(len);
    let mut layer_builders: Vec<Float32Builder> =
        layers.iter().map(|_| Float32Builder::with_capacity(len)).collect();

    for cell in cells {
        let row = cell / grid.ncols;
        let col = cell % grid.ncols;

        date_builder.append_value(date32);
        row_builder.append_value(row as u32);
        col_builder.append_value(col as u32);
        lat_builder.append_value(grid.lat(row));
        lon_builder.append_value(grid.lon(col));

        for (builder, layer) in layer_builders.iter_mut().zip(layers) {
            let value = layer.values[cell];
            builder.append_option((!value.is_nan()).then_some(value));
        }
    }

    let mut columns: Vec<ArrayRef> = vec![
        Arc::new(date_builder.finish()),
        Arc::new(row_builder.finish()),
        Arc::new(col_builder.finish()),
        Arc::new(lat_builder.finish()),
        Arc::new(lon_builder.finish()),
    ];
    columns.extend(
        layer_builders
            .iter_mut()
            .map(|builder| Arc::new(builder.finish()) as ArrayRef),
    );

    Ok(RecordBatch::try_new(schema.clone(), columns)?)
}

fn grid_metadata(grid: &Grid) -> Vec<KeyValue> {
    [
        ("lwf.ncols", grid.ncols.to_string()),
        ("lwf.nrows", grid.nrows.to_string()),
        ("lwf.west", grid.west.to_string()),
        ("lwf.north", grid.north.to_string()),
        ("lwf.dx", grid.dx.to_string()),
        ("lwf.dy", grid.dy.to_string()),
    ]
    .into_iter()
    .map(|(key, value)| KeyValue::new(key.to_string(), value))
    .collect()
}

fn days_since_epoch(date: NaiveDate) -> i32 {
    let epoch_offset = NaiveDate::from_ymd_opt(1970, 1, 1)
        .map(|epoch| epoch.num_days_from_ce())
        .unwrap_or(719_163);

    date.num_days_from_ce() - epoch_offset
}

// -- Tests -------------------------------------------------------------------
