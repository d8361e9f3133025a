//! Module for working with snowflake IDs.
//!
//! A snowflake packs, from the most significant bit down, 42 bits of
//! milliseconds since an [`Epoch`], a 5 bit worker id, a 5 bit process id and a
//! 12 bit increment.
//!
//! See <https://discord.com/developers/docs/reference#snowflakes>

use derive_where::derive_where;
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use std::{
    fmt::{Display, Formatter},
    marker::PhantomData,
};
use thiserror::Error;
use time::{Duration, UtcDateTime};

pub const TIMESTAMP_OFFSET: u32 = 22;
pub const TIMESTAMP_LENGTH: u32 = 42;
pub const WORKER_ID_OFFSET: u32 = 17;
pub const PROCESS_ID_OFFSET: u32 = 12;
pub const MACHINE_ID_LENGTH: u32 = 5;
pub const INCREMENT_LENGTH: u32 = 12;

const MACHINE_ID_MASK: u64 = (1 << MACHINE_ID_LENGTH) - 1;
const INCREMENT_MASK: u64 = (1 << INCREMENT_LENGTH) - 1;

pub trait Epoch {
    const EPOCH_TIME: UtcDateTime;
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum SnowflakeTimeError {
    #[error("Specified time was before the snowflake epoch.")]
    TimeBeforeEpoch,
    #[error("Resulting timestamp uses too many bits.")]
    TimestampTooLarge,
}

macro_rules! machine_id {
    ($name:ident) => {
        #[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
        pub struct $name(u8);

        impl $name {
            #[must_use]
            pub fn new(id: u8) -> Option<Self> {
                (u64::from(id) <= MACHINE_ID_MASK).then_some(Self(id))
            }

            #[must_use]
            pub fn get(self) -> u8 {
                self.0
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let inner = u8::deserialize(deserializer)?;
                Self::new(inner).ok_or_else(|| {
                    Error::invalid_value(Unexpected::Unsigned(inner.into()), &stringify!($name))
                })
            }
        }
    };
}

machine_id!(WorkerId);
machine_id!(ProcessId);

#[derive_where(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snowflake<SnowflakeEpoch>(u64, #[serde(skip)] PhantomData<SnowflakeEpoch>);

impl<SnowflakeEpoch> Snowflake<SnowflakeEpoch> {
    #[must_use]
    pub fn new(inner: u64) -> Self {
        Self(inner, PhantomData)
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn timestamp_millis(self) -> u64 {
        self.0 >> TIMESTAMP_OFFSET
    }

    #[must_use]
    pub fn worker_id(self) -> WorkerId {
        #[allow(clippy::cast_possible_truncation)]
        WorkerId(((self.0 >> WORKER_ID_OFFSET) & MACHINE_ID_MASK) as u8)
    }

    #[must_use]
    pub fn process_id(self) -> ProcessId {
        #[allow(clippy::cast_possible_truncation)]
        ProcessId(((self.0 >> PROCESS_ID_OFFSET) & MACHINE_ID_MASK) as u8)
    }

    #[must_use]
    pub fn increment(self) -> u16 {
        #[allow(clippy::cast_possible_truncation)]
        let increment = (self.0 & INCREMENT_MASK) as u16;
        increment
    }

    /// Packs the parts into a snowflake. The increment is truncated to its
    /// 12 bits.
    pub fn from_parts(
        time: UtcDateTime,
        worker_id: WorkerId,
        process_id: ProcessId,
        increment: u16,
    ) -> Result<Self, SnowflakeTimeError>
    where
        SnowflakeEpoch: Epoch,
    {
        let millis = (time - SnowflakeEpoch::EPOCH_TIME).whole_milliseconds();
        let millis = u64::try_from(millis).map_err(|_| SnowflakeTimeError::TimeBeforeEpoch)?;
        if millis >= 1 << TIMESTAMP_LENGTH {
            return Err(SnowflakeTimeError::TimestampTooLarge);
        }

        Ok(Self::new(
            millis << TIMESTAMP_OFFSET
                | u64::from(worker_id.get()) << WORKER_ID_OFFSET
                | u64::from(process_id.get()) << PROCESS_ID_OFFSET
                | u64::from(increment) & INCREMENT_MASK,
        ))
    }

    /// The moment this snowflake was generated, at millisecond precision.
    #[must_use]
    pub fn created_at(self) -> UtcDateTime
    where
        SnowflakeEpoch: Epoch,
    {
        #[allow(clippy::cast_possible_wrap)]
        let millis = self.timestamp_millis() as i64;
        SnowflakeEpoch::EPOCH_TIME + Duration::milliseconds(millis)
    }
}

impl<SnowflakeEpoch> Display for Snowflake<SnowflakeEpoch> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<SnowflakeEpoch> From<u64> for Snowflake<SnowflakeEpoch> {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

#[derive_where(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct SnowflakeGenerator<SnowflakeEpoch> {
    worker_id: WorkerId,
    process_id: ProcessId,
    next_increment: u16,
    phantom_data: PhantomData<SnowflakeEpoch>,
}

impl<SnowflakeEpoch: Epoch> SnowflakeGenerator<SnowflakeEpoch> {
    #[must_use]
    pub fn new(worker_id: WorkerId, process_id: ProcessId) -> Self {
        Self {
            worker_id,
            process_id,
            next_increment: 0,
            phantom_data: PhantomData,
        }
    }

    pub fn generate_at(
        &mut self,
        time: UtcDateTime,
    ) -> Result<Snowflake<SnowflakeEpoch>, SnowflakeTimeError> {
        let snowflake =
            Snowflake::from_parts(time, self.worker_id, self.process_id, self.next_increment)?;

        #[allow(clippy::cast_possible_truncation)]
        let wrap = (INCREMENT_MASK + 1) as u16;
        self.next_increment = (self.next_increment + 1) % wrap;

        Ok(snowflake)
    }

    pub fn generate(&mut self) -> Result<Snowflake<SnowflakeEpoch>, SnowflakeTimeError> {
        self.generate_at(UtcDateTime::now())
    }
}

#[cfg(test)]
mod tests {
    use crate::snowflake::{
        Epoch, ProcessId, Snowflake, SnowflakeGenerator, SnowflakeTimeError, WorkerId,
    };
    use time::{Duration, UtcDateTime, macros::utc_datetime};

    struct MillennialEpoch;
    impl Epoch for MillennialEpoch {
        const EPOCH_TIME: UtcDateTime = utc_datetime!(2000-1-1 00:00);
    }

    #[test]
    fn machine_id_range() {
        for legal_id in [0, 0xD, 0x1F] {
            assert!(WorkerId::new(legal_id).is_some());
            assert!(ProcessId::new(legal_id).is_some());
        }
        for illegal_id in [0x20, 0xF0, u8::MAX] {
            assert!(WorkerId::new(illegal_id).is_none());
            assert!(ProcessId::new(illegal_id).is_none());
        }
    }

    #[test]
    fn parts_are_recoverable() {
        let time = utc_datetime!(2025-10-24 10:30);
        let worker_id = WorkerId::new(0b10101).unwrap();
        let process_id = ProcessId::new(0b10001).unwrap();

        let snowflake =
            Snowflake::<MillennialEpoch>::from_parts(time, worker_id, process_id, 100).unwrap();

        assert_eq!(snowflake.created_at(), time);
        assert_eq!(snowflake.worker_id(), worker_id);
        assert_eq!(snowflake.process_id(), process_id);
        assert_eq!(snowflake.increment(), 100);
    }

    #[test]
    fn time_out_of_range() {
        let worker_id = WorkerId::default();
        let process_id = ProcessId::default();

        assert_eq!(
            Snowflake::<MillennialEpoch>::from_parts(
                MillennialEpoch::EPOCH_TIME - Duration::milliseconds(1),
                worker_id,
                process_id,
                0
            ),
            Err(SnowflakeTimeError::TimeBeforeEpoch)
        );
        assert_eq!(
            Snowflake::<MillennialEpoch>::from_parts(
                MillennialEpoch::EPOCH_TIME + Duration::milliseconds(0x0400_0000_0000),
                worker_id,
                process_id,
                0
            ),
            Err(SnowflakeTimeError::TimestampTooLarge)
        );
    }

    #[test]
    fn generator_increments_and_wraps() {
        let time = utc_datetime!(2025-10-24 10:55);
        let mut generator =
            SnowflakeGenerator::<MillennialEpoch>::new(WorkerId::new(10).unwrap(), ProcessId::default());

        let first = generator.generate_at(time).unwrap();
        let second = generator.generate_at(time).unwrap();
        assert_eq!(first.increment(), 0);
        assert_eq!(second.increment(), 1);
        assert!(first < second);

        for _ in 2..0x1000 {
            generator.generate_at(time).unwrap();
        }
        assert_eq!(generator.generate_at(time).unwrap().increment(), 0);
    }
}
