use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[(self.next_u64() % items.len() as u64) as usize]
    }

    /// True with probability `p`.
    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}

/// One listing of the synthetic housing table.
struct Listing {
    id: i64,
    area_sqm: Option<f64>,
    rooms: i64,
    city: &'static str,
    condition: Option<&'static str>,
    description: String,
    price: f64,
}

const CITIES: [&str; 5] = ["Oslo", "Bergen", "Trondheim", "Stavanger", "Tromsø"];
const CONDITIONS: [&str; 4] = ["new", "good", "fair", "needs work"];
const FEATURES: [&str; 6] = ["balcony", "garden", "garage", "sea view", "fireplace", "lift"];

fn city_factor(city: &str) -> f64 {
    match city {
        "Oslo" => 1.6,
        "Bergen" => 1.25,
        "Stavanger" => 1.2,
        "Trondheim" => 1.1,
        _ => 0.95,
    }
}

fn generate(n: usize, rng: &mut SimpleRng) -> Vec<Listing> {
    (0..n)
        .map(|i| {
            let rooms = 1 + (rng.next_u64() % 6) as i64;
            let area = (18.0 + rooms as f64 * 22.0 + rng.gauss(0.0, 9.0)).max(15.0);
            let city = rng.pick(&CITIES);
            let condition = rng.pick(&CONDITIONS);
            let feature = rng.pick(&FEATURES);
            let price = area * 42_000.0 * city_factor(city) + rng.gauss(0.0, 150_000.0);

            Listing {
                id: i as i64 + 1,
                area_sqm: (!rng.chance(0.05)).then(|| (area * 10.0).round() / 10.0),
                rooms,
                city,
                condition: (!rng.chance(0.08)).then_some(condition),
                description: format!("{rooms}-room flat in {city} with {feature}"),
                price: price.max(500_000.0).round(),
            }
        })
        .collect()
}

fn write_csv(path: &str, listings: &[Listing]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating {path}"))?;
    writer.write_record([
        "id",
        "area_sqm",
        "rooms",
        "city",
        "condition",
        "description",
        "price",
    ])?;
    for l in listings {
        writer.write_record([
            l.id.to_string(),
            l.area_sqm.map(|a| a.to_string()).unwrap_or_default(),
            l.rooms.to_string(),
            l.city.to_string(),
            l.condition.unwrap_or_default().to_string(),
            l.description.clone(),
            l.price.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(path: &str, listings: &[Listing]) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("area_sqm", DataType::Float64, true),
        Field::new("rooms", DataType::Int64, false),
        Field::new("city", DataType::Utf8, false),
        Field::new("condition", DataType::Utf8, true),
        Field::new("description", DataType::Utf8, false),
        Field::new("price", DataType::Float64, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from_iter_values(listings.iter().map(|l| l.id))),
            Arc::new(Float64Array::from(
                listings.iter().map(|l| l.area_sqm).collect::<Vec<_>>(),
            )),
            Arc::new(Int64Array::from_iter_values(listings.iter().map(|l| l.rooms))),
            Arc::new(StringArray::from_iter_values(listings.iter().map(|l| l.city))),
            Arc::new(StringArray::from(
                listings.iter().map(|l| l.condition).collect::<Vec<_>>(),
            )),
            Arc::new(StringArray::from_iter_values(
                listings.iter().map(|l| l.description.as_str()),
            )),
            Arc::new(Float64Array::from_iter_values(listings.iter().map(|l| l.price))),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).with_context(|| format!("creating {path}"))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing writer")?;
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let listings = generate(250, &mut rng);

    write_csv("sample_data.csv", &listings)?;
    write_parquet("sample_data.parquet", &listings)?;

    println!(
        "Wrote {} listings to sample_data.csv and sample_data.parquet",
        listings.len()
    );
    Ok(())
}
