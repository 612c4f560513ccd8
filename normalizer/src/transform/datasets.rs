//! The seven ONS source files and how each one is normalized.
//!
//! Each `parse_*` function reads one file from the CSV directory and returns
//! a table keyed by [`LA_CODE`]. Row granularity is part of the contract:
//!
//! | Dataset | Output rows |
//! |---|---|
//! | wellbeing | one per (la_code, wellbeing_measure), long form |
//! | population | one per (la_code, la_name), wards summed |
//! | rental, crime, property prices, earnings ratio | one per source row with a code |
//! | property sales | one per la_code, wards summed |
//!
//! [`parse_wellbeing_wide`] gives the one-row-per-authority wellbeing table.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use super::aggregate::{drop_duplicates, pivot, Aggregation};
use super::derive::{RowFilter, SumColumns};
use super::pipeline::{run_dataset, DatasetSpec};
use super::rename::RenameSpec;
use crate::config::{
    AGE_BUCKETS, CRIME_FILE, EARNINGS_RATIO_FILE, HOUSE_PRICES_FILE, LA_CODE, LA_NAME,
    POPULATION_FILE, PROPERTY_SALES_FILE, RENTAL_FILE, WARD_CODE, WARD_NAME, WELLBEING_AVERAGE,
    WELLBEING_FILE,
};
use crate::error::{NormalizeError, TransformError};
use crate::models::Table;
use crate::parser::ReadOptions;

pub const WELLBEING_MEASURE: &str = "wellbeing_measure";
pub const WELLBEING_SCORE: &str = "wellbeing_score";
pub const TOTAL_POPULATION: &str = "total_population";
pub const NUM_SOLD: &str = "num_sold";

/// Column holding the reporting period in the wellbeing file.
pub const WELLBEING_PERIOD_COLUMN: &str = "Time";

// =============================================================================
// Dataset names
// =============================================================================

/// One of the supported source files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataset {
    Wellbeing,
    Population,
    Rental,
    Crime,
    PropertySales,
    PropertyPrices,
    EarningsRatio,
}

impl Dataset {
    pub const ALL: [Dataset; 7] = [
        Dataset::Wellbeing,
        Dataset::Population,
        Dataset::Rental,
        Dataset::Crime,
        Dataset::PropertySales,
        Dataset::PropertyPrices,
        Dataset::EarningsRatio,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Dataset::Wellbeing => "wellbeing",
            Dataset::Population => "population",
            Dataset::Rental => "rental",
            Dataset::Crime => "crime",
            Dataset::PropertySales => "property-sales",
            Dataset::PropertyPrices => "property-prices",
            Dataset::EarningsRatio => "earnings-ratio",
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            Dataset::Wellbeing => WELLBEING_FILE,
            Dataset::Population => POPULATION_FILE,
            Dataset::Rental => RENTAL_FILE,
            Dataset::Crime => CRIME_FILE,
            Dataset::PropertySales => PROPERTY_SALES_FILE,
            Dataset::PropertyPrices => HOUSE_PRICES_FILE,
            Dataset::EarningsRatio => EARNINGS_RATIO_FILE,
        }
    }

    pub fn spec(self) -> DatasetSpec {
        match self {
            Dataset::Wellbeing => wellbeing_spec(),
            Dataset::Population => population_spec(),
            Dataset::Rental => rental_spec(),
            Dataset::Crime => crime_spec(),
            Dataset::PropertySales => property_sales_spec(),
            Dataset::PropertyPrices => property_prices_spec(),
            Dataset::EarningsRatio => earnings_ratio_spec(),
        }
    }

    /// Normalize this dataset from `csv_dir` with default read options.
    pub fn normalize(self, csv_dir: impl AsRef<Path>) -> Result<Table, NormalizeError> {
        self.normalize_with(csv_dir, &ReadOptions::default())
    }

    pub fn normalize_with(
        self,
        csv_dir: impl AsRef<Path>,
        options: &ReadOptions,
    ) -> Result<Table, NormalizeError> {
        run_dataset(csv_dir.as_ref(), &self.spec(), options)
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dataset {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('_', "-");
        Dataset::ALL
            .into_iter()
            .find(|d| d.name() == wanted)
            .ok_or_else(|| TransformError::UnknownDataset(s.to_string()))
    }
}

/// Specs for every dataset, in a fixed order.
pub fn all_datasets() -> Vec<DatasetSpec> {
    Dataset::ALL.into_iter().map(Dataset::spec).collect()
}

// =============================================================================
// Specs
// =============================================================================

/// Average wellbeing score per authority and measure.
///
/// Source: ONS "wellbeing-local-authority" time series. Only rows whose
/// estimate type is the mean are kept; the file also carries confidence
/// intervals and sample sizes. The series holds several periods and the
/// output has no period column, so the first row per (authority, measure)
/// in file order wins.
pub fn wellbeing_spec() -> DatasetSpec {
    DatasetSpec::new(
        Dataset::Wellbeing.name(),
        WELLBEING_FILE,
        RenameSpec::new()
            .rename("administrative-geography", LA_CODE)
            .rename("measure-of-wellbeing", WELLBEING_MEASURE)
            .rename("V4_3", WELLBEING_SCORE),
    )
    .with_filter(RowFilter::equals("wellbeing-estimate", WELLBEING_AVERAGE))
    .require_key(LA_CODE)
    .unique_by([LA_CODE, WELLBEING_MEASURE])
}

/// Mid-year population by single year of age, bucketed and summed per
/// authority. Source: ward-level SAPE estimates ("Mid-2020 Persons" sheet).
pub fn population_spec() -> DatasetSpec {
    let mut spec = DatasetSpec::new(
        Dataset::Population.name(),
        POPULATION_FILE,
        RenameSpec::new()
            .rename("LA Code (2021 boundaries)", LA_CODE)
            .rename("LA name (2021 boundaries)", LA_NAME)
            .rename("Ward Code 1", WARD_CODE)
            .rename("Ward Name 1", WARD_NAME)
            .rename("All Ages", TOTAL_POPULATION),
    )
    .require_key(LA_CODE);

    let mut summed = vec![TOTAL_POPULATION.to_string()];
    for bucket in &AGE_BUCKETS {
        spec.rename.insert(bucket.name, bucket.name);
        spec = spec.with_derived(SumColumns::from_bucket(bucket));
        summed.push(bucket.name.to_string());
    }

    spec.with_aggregation(Aggregation::GroupSum {
        by: vec![LA_CODE.to_string(), LA_NAME.to_string()],
        sum: summed,
    })
}

/// Private rental market summary (sheet "Table2.7"). Rows without an area
/// code are regional or national totals.
pub fn rental_spec() -> DatasetSpec {
    DatasetSpec::new(
        Dataset::Rental.name(),
        RENTAL_FILE,
        RenameSpec::new()
            .rename("Area Code1", LA_CODE)
            .rename("Count of rents", "rent_count")
            .rename("Median", "median_rent")
            .rename("Mean", "mean_rent"),
    )
    .require_key(LA_CODE)
}

/// Recorded crime by community safety partnership (sheet "Table C5").
pub fn crime_spec() -> DatasetSpec {
    DatasetSpec::new(
        Dataset::Crime.name(),
        CRIME_FILE,
        RenameSpec::new()
            .rename("Local Authority code", LA_CODE)
            .rename(
                "Household figures (mid-2019) - rounded to 100",
                "num_households",
            )
            .rename("Total recorded crime\n (excluding fraud)", "total_crime")
            .rename(
                "Residential burglary (per 1,000 household)",
                "burgalry_per_household",
            ),
    )
    .require_key(LA_CODE)
}

/// Residential property sales by ward (HPSSA dataset 36, sheet "1a"),
/// summed per authority.
pub fn property_sales_spec() -> DatasetSpec {
    DatasetSpec::new(
        Dataset::PropertySales.name(),
        PROPERTY_SALES_FILE,
        RenameSpec::new()
            .rename("Local authority code", LA_CODE)
            .rename("Ward code", WARD_CODE)
            .rename("Year ending Jun 2021", NUM_SOLD),
    )
    .require_key(LA_CODE)
    .with_aggregation(Aggregation::GroupSum {
        by: vec![LA_CODE.to_string()],
        sum: vec![NUM_SOLD.to_string()],
    })
}

/// Median price paid for existing dwellings (HPSSA dataset 11, sheet "1a").
///
/// The source header really does end with a space.
pub fn property_prices_spec() -> DatasetSpec {
    DatasetSpec::new(
        Dataset::PropertyPrices.name(),
        HOUSE_PRICES_FILE,
        RenameSpec::new()
            .rename("Local authority code ", LA_CODE)
            .rename("Year ending Jun 2021", "property_price"),
    )
    .require_key(LA_CODE)
}

/// Ratio of median house price to median workplace-based earnings (sheet "5c").
pub fn earnings_ratio_spec() -> DatasetSpec {
    DatasetSpec::new(
        Dataset::EarningsRatio.name(),
        EARNINGS_RATIO_FILE,
        RenameSpec::new()
            .rename("Code", LA_CODE)
            .rename("2020", "earnings_house_price_ratio"),
    )
    .require_key(LA_CODE)
}

// =============================================================================
// Transforms
// =============================================================================

pub fn parse_wellbeing(csv_dir: impl AsRef<Path>) -> Result<Table, NormalizeError> {
    Dataset::Wellbeing.normalize(csv_dir)
}

/// Wellbeing restricted to one reporting period, e.g. `"2020-21"`.
pub fn parse_wellbeing_for_period(
    csv_dir: impl AsRef<Path>,
    period: &str,
    options: &ReadOptions,
) -> Result<Table, NormalizeError> {
    let spec = wellbeing_spec().with_filter(RowFilter::equals(WELLBEING_PERIOD_COLUMN, period));
    run_dataset(csv_dir.as_ref(), &spec, options)
}

/// One row per authority with one column per wellbeing measure.
///
/// Repeated (authority, measure) pairs keep their first score. Without a
/// `period` every year in the file competes for that slot, so pass one when
/// the file holds a time series.
pub fn parse_wellbeing_wide(
    csv_dir: impl AsRef<Path>,
    period: Option<&str>,
    options: &ReadOptions,
) -> Result<Table, NormalizeError> {
    let long = match period {
        Some(period) => parse_wellbeing_for_period(csv_dir, period, options)?,
        None => Dataset::Wellbeing.normalize_with(csv_dir, options)?,
    };
    Ok(wellbeing_to_wide(long)?)
}

/// Pivot a long wellbeing table into one row per authority.
pub fn wellbeing_to_wide(mut long: Table) -> Result<Table, TransformError> {
    drop_duplicates(
        &mut long,
        &[LA_CODE.to_string(), WELLBEING_MEASURE.to_string()],
    )?;
    pivot(&long, LA_CODE, WELLBEING_MEASURE, WELLBEING_SCORE)
}

pub fn parse_population_age(csv_dir: impl AsRef<Path>) -> Result<Table, NormalizeError> {
    Dataset::Population.normalize(csv_dir)
}

pub fn parse_rental_summary(csv_dir: impl AsRef<Path>) -> Result<Table, NormalizeError> {
    Dataset::Rental.normalize(csv_dir)
}

pub fn parse_crime(csv_dir: impl AsRef<Path>) -> Result<Table, NormalizeError> {
    Dataset::Crime.normalize(csv_dir)
}

pub fn parse_property_sales(csv_dir: impl AsRef<Path>) -> Result<Table, NormalizeError> {
    Dataset::PropertySales.normalize(csv_dir)
}

pub fn parse_property_prices(csv_dir: impl AsRef<Path>) -> Result<Table, NormalizeError> {
    Dataset::PropertyPrices.normalize(csv_dir)
}

pub fn parse_earnings_to_house_price(csv_dir: impl AsRef<Path>) -> Result<Table, NormalizeError> {
    Dataset::EarningsRatio.normalize(csv_dir)
}
