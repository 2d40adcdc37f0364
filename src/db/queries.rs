pub const CREATE_DEVICE_EVENTS: &str = r#"
CREATE TABLE IF NOT EXISTS device_events (
    device text,
    generatedts timestamp,
    speed double precision,
    heading bigint,
    latitude double precision,
    longitude double precision
);
"#;

pub const CREATE_DEVICE_EVENTS_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS device_events_device_generatedts_idx
ON device_events (device, generatedts DESC);
"#;

// Casts keep tables created with numeric/integer columns readable.
pub const SELECT_LATEST_EVENT: &str = r#"
SELECT device,
       generatedts,
       speed::float8 AS speed,
       heading::bigint AS heading,
       latitude::float8 AS latitude,
       longitude::float8 AS longitude
FROM device_events
WHERE device = $1
ORDER BY generatedts DESC
LIMIT 1;
"#;

pub const INSERT_DEVICE_EVENT: &str = r#"
INSERT INTO device_events (device, generatedts, speed, heading, latitude, longitude)
VALUES ($1, $2, $3, $4, $5, $6);
"#;

// generatedts is left alone; latest-row ordering keeps following the log.
pub const UPDATE_CURRENT_STATE: &str = r#"
UPDATE device_events
SET speed = $2,
    heading = $3,
    latitude = $4,
    longitude = $5
WHERE device = $1;
"#;
