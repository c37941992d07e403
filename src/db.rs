use anyhow::Context;
use chrono::{Datelike, NaiveDateTime, Weekday};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{MobileReading, RawSample, StoreStatus, WeekdayBuckets, WifiReading};
use crate::store::{bucket_samples, SampleStore};

const UNDEFINED_TABLE: &str = "42P01";

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub struct PgSampleStore {
    pool: PgPool,
    bucket_minutes: u32,
    staged: Mutex<Vec<RawSample>>,
}

impl PgSampleStore {
    pub async fn connect(database_url: &str, bucket_minutes: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .context("failed to connect to Postgres")?;
        Ok(Self {
            pool,
            bucket_minutes,
            staged: Mutex::new(Vec::new()),
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn weekday_key(weekday: Weekday) -> i16 {
    weekday.num_days_from_sunday() as i16
}

fn to_bytes(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn to_column(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

impl SampleStore for PgSampleStore {
    async fn open(&self) -> anyhow::Result<StoreStatus> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM netstats.samples")
            .fetch_one(&self.pool)
            .await;

        match count {
            Ok(0) => Ok(StoreStatus::Empty),
            Ok(_) => Ok(StoreStatus::Ready),
            Err(sqlx::Error::Database(err)) if err.code().as_deref() == Some(UNDEFINED_TABLE) => {
                warn!("netstats schema is missing; run init-db");
                Ok(StoreStatus::Error)
            }
            Err(err) => Err(err).context("failed to count stored samples"),
        }
    }

    async fn records_for_weekday(&self, weekday: Weekday) -> anyhow::Result<WeekdayBuckets> {
        let rows = sqlx::query(
            r#"
            SELECT started_at, ended_at,
                   wifi_connected, wifi_data_sent, wifi_data_received,
                   wifi_bandwidth, wifi_signal_strength,
                   mobile_connected, mobile_metered, mobile_roaming,
                   mobile_data_sent, mobile_data_received, mobile_signal_strength
            FROM netstats.samples
            WHERE weekday = $1
            ORDER BY started_at
            "#,
        )
        .bind(weekday_key(weekday))
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("failed to load samples for {weekday}"))?;

        let mut samples = Vec::with_capacity(rows.len());
        for row in rows {
            samples.push(RawSample {
                start: row.get("started_at"),
                end: row.get("ended_at"),
                wifi: WifiReading {
                    connected: row.get("wifi_connected"),
                    data_sent: to_bytes(row.get("wifi_data_sent")),
                    data_received: to_bytes(row.get("wifi_data_received")),
                    bandwidth: row.get("wifi_bandwidth"),
                    signal_strength: row.get("wifi_signal_strength"),
                },
                mobile: MobileReading {
                    connected: row.get("mobile_connected"),
                    metered: row.get("mobile_metered"),
                    roaming: row.get("mobile_roaming"),
                    data_sent: to_bytes(row.get("mobile_data_sent")),
                    data_received: to_bytes(row.get("mobile_data_received")),
                    signal_strength: row.get("mobile_signal_strength"),
                },
            });
        }

        Ok(bucket_samples(samples, self.bucket_minutes))
    }

    async fn stage_samples(&self, samples: Vec<RawSample>) {
        self.staged.lock().await.extend(samples);
    }

    async fn save(&self) -> anyhow::Result<usize> {
        let staged = std::mem::take(&mut *self.staged.lock().await);
        if staged.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut inserted = 0usize;

        for sample in &staged {
            let result = sqlx::query(
                r#"
                INSERT INTO netstats.samples
                (id, weekday, started_at, ended_at,
                 wifi_connected, wifi_data_sent, wifi_data_received,
                 wifi_bandwidth, wifi_signal_strength,
                 mobile_connected, mobile_metered, mobile_roaming,
                 mobile_data_sent, mobile_data_received, mobile_signal_strength)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
                ON CONFLICT (started_at) DO NOTHING
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(weekday_key(sample.start.weekday()))
            .bind(sample.start)
            .bind(sample.end)
            .bind(sample.wifi.connected)
            .bind(to_column(sample.wifi.data_sent))
            .bind(to_column(sample.wifi.data_received))
            .bind(sample.wifi.bandwidth)
            .bind(sample.wifi.signal_strength)
            .bind(sample.mobile.connected)
            .bind(sample.mobile.metered)
            .bind(sample.mobile.roaming)
            .bind(to_column(sample.mobile.data_sent))
            .bind(to_column(sample.mobile.data_received))
            .bind(sample.mobile.signal_strength)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() > 0 {
                inserted += 1;
            }
        }

        tx.commit().await.context("failed to commit staged samples")?;
        info!(inserted, staged = staged.len(), "saved samples");
        Ok(inserted)
    }
}

#[derive(serde::Deserialize)]
struct CsvRow {
    started_at: NaiveDateTime,
    ended_at: NaiveDateTime,
    wifi_connected: bool,
    wifi_data_sent: u64,
    wifi_data_received: u64,
    wifi_bandwidth: f64,
    wifi_signal_strength: f64,
    mobile_connected: bool,
    mobile_metered: bool,
    mobile_roaming: bool,
    mobile_data_sent: u64,
    mobile_data_received: u64,
    mobile_signal_strength: f64,
}

pub fn read_samples_csv(reader: impl std::io::Read) -> anyhow::Result<Vec<RawSample>> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut samples = Vec::new();

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("invalid sample on data row {}", line + 1))?;
        if row.ended_at < row.started_at {
            anyhow::bail!("sample on data row {} ends before it starts", line + 1);
        }
        samples.push(RawSample {
            start: row.started_at,
            end: row.ended_at,
            wifi: WifiReading {
                connected: row.wifi_connected,
                data_sent: row.wifi_data_sent,
                data_received: row.wifi_data_received,
                bandwidth: row.wifi_bandwidth,
                signal_strength: row.wifi_signal_strength,
            },
            mobile: MobileReading {
                connected: row.mobile_connected,
                metered: row.mobile_metered,
                roaming: row.mobile_roaming,
                data_sent: row.mobile_data_sent,
                data_received: row.mobile_data_received,
                signal_strength: row.mobile_signal_strength,
            },
        });
    }

    Ok(samples)
}

pub async fn import_csv(
    store: &impl SampleStore,
    csv_path: &std::path::Path,
) -> anyhow::Result<usize> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let samples = read_samples_csv(file)?;
    store.stage_samples(samples).await;
    store.save().await
}
