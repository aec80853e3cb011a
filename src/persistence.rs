//! Profile persistence.
//!
//! The router calls a `ProfileStore` at profile-switch boundaries: it
//! saves the profile being left and loads the one being entered. Failures
//! are never fatal; the router keeps the in-memory fields and notes the
//! failure in its debug entry.
//!
//! `ProfileCache` is the RAM-side store. The firmware syncs its dirty
//! slots to flash (one `sequential-storage` map item per profile) and
//! restores them at boot.
//!
//! Record layout per profile:
//!   `[mode0][mode1]` then per key `[macro_id][r][g][b][label_len][label...]`

use heapless::String;

use crate::config::{
    KEY_LABEL_LEN, NUM_ENCODERS, NUM_MACRO_KEYS, PROFILE_COUNT, PROFILE_MAX, PROFILE_MIN,
};
use crate::state::{EncoderMode, KeySlot, LedColor, ProfileSnapshot};

/// Largest encoded profile record.
pub const MAX_PROFILE_RECORD: usize = NUM_ENCODERS + NUM_MACRO_KEYS * (5 + KEY_LABEL_LEN);

/// Load/save collaborator keyed by profile number (1-based).
pub trait ProfileStore {
    type Error;

    /// `Ok(None)` means the slot has never been written.
    fn load(&mut self, profile: u8) -> Result<Option<ProfileSnapshot>, Self::Error>;

    fn save(&mut self, profile: u8, snapshot: &ProfileSnapshot) -> Result<(), Self::Error>;
}

impl<T: ProfileStore + ?Sized> ProfileStore for &mut T {
    type Error = T::Error;

    fn load(&mut self, profile: u8) -> Result<Option<ProfileSnapshot>, Self::Error> {
        (**self).load(profile)
    }

    fn save(&mut self, profile: u8, snapshot: &ProfileSnapshot) -> Result<(), Self::Error> {
        (**self).save(profile, snapshot)
    }
}

/// Why a cache access was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CacheError {
    /// Profile number outside `PROFILE_MIN..=PROFILE_MAX`.
    NoSuchProfile(u8),
}

/// In-memory copy of every profile slot, synced with flash.
pub struct ProfileCache {
    slots: [Option<ProfileSnapshot>; PROFILE_COUNT],
    /// Bit `n` set - slot `n` differs from flash.
    dirty: u8,
}

impl Default for ProfileCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileCache {
    pub const fn new() -> Self {
        Self {
            slots: [const { None }; PROFILE_COUNT],
            dirty: 0,
        }
    }

    fn slot_index(profile: u8) -> Result<usize, CacheError> {
        if (PROFILE_MIN..=PROFILE_MAX).contains(&profile) {
            Ok((profile - PROFILE_MIN) as usize)
        } else {
            Err(CacheError::NoSuchProfile(profile))
        }
    }

    pub fn get(&self, profile: u8) -> Option<&ProfileSnapshot> {
        let index = Self::slot_index(profile).ok()?;
        self.slots[index].as_ref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty != 0
    }

    /// Profiles whose cached copy has not been written to flash yet.
    pub fn dirty_profiles(&self) -> impl Iterator<Item = u8> + '_ {
        (0..PROFILE_COUNT)
            .filter(move |i| self.dirty & (1 << i) != 0)
            .map(|i| i as u8 + PROFILE_MIN)
    }

    /// Encode one slot for flash. Returns 0 for an empty slot or a short
    /// buffer.
    pub fn serialize_slot(&self, profile: u8, buf: &mut [u8]) -> usize {
        match self.get(profile) {
            Some(snapshot) => encode_snapshot(snapshot, buf),
            None => 0,
        }
    }

    /// Install a record read back from flash. Leaves the slot clean.
    pub fn restore_slot(&mut self, profile: u8, data: &[u8]) -> bool {
        let Ok(index) = Self::slot_index(profile) else {
            return false;
        };
        match decode_snapshot(data) {
            Some(snapshot) => {
                self.slots[index] = Some(snapshot);
                self.dirty &= !(1 << index);
                true
            }
            None => {
                warn!("profile {} record is corrupt, ignoring", profile);
                false
            }
        }
    }

    /// Flash write for `profile` succeeded.
    pub fn mark_clean(&mut self, profile: u8) {
        if let Ok(index) = Self::slot_index(profile) {
            self.dirty &= !(1 << index);
        }
    }
}

impl ProfileStore for ProfileCache {
    type Error = CacheError;

    fn load(&mut self, profile: u8) -> Result<Option<ProfileSnapshot>, CacheError> {
        let index = Self::slot_index(profile)?;
        Ok(self.slots[index].clone())
    }

    fn save(&mut self, profile: u8, snapshot: &ProfileSnapshot) -> Result<(), CacheError> {
        let index = Self::slot_index(profile)?;
        if self.slots[index].as_ref() == Some(snapshot) {
            return Ok(());
        }
        self.slots[index] = Some(snapshot.clone());
        self.dirty |= 1 << index;
        debug!("profile {} cached", profile);
        Ok(())
    }
}

/// Serialise a snapshot. Returns bytes written, or 0 if `buf` is too small.
pub fn encode_snapshot(snapshot: &ProfileSnapshot, buf: &mut [u8]) -> usize {
    let total = NUM_ENCODERS
        + snapshot
            .keys
            .iter()
            .map(|k| 5 + k.label.len())
            .sum::<usize>();
    if buf.len() < total {
        return 0;
    }

    for (slot, mode) in snapshot.encoder_mode.iter().enumerate() {
        buf[slot] = mode.index() as u8;
    }

    let mut offset = NUM_ENCODERS;
    for key in &snapshot.keys {
        let label = key.label.as_bytes();
        buf[offset] = key.macro_id;
        buf[offset + 1] = key.color.r;
        buf[offset + 2] = key.color.g;
        buf[offset + 3] = key.color.b;
        buf[offset + 4] = label.len() as u8;
        buf[offset + 5..offset + 5 + label.len()].copy_from_slice(label);
        offset += 5 + label.len();
    }
    offset
}

/// Parse a record written by `encode_snapshot`.
pub fn decode_snapshot(data: &[u8]) -> Option<ProfileSnapshot> {
    if data.len() < NUM_ENCODERS {
        return None;
    }

    let mut encoder_mode = [EncoderMode::Volume; NUM_ENCODERS];
    for (slot, mode) in encoder_mode.iter_mut().enumerate() {
        *mode = EncoderMode::from_u8(data[slot])?;
    }

    let mut offset = NUM_ENCODERS;
    let mut keys: heapless::Vec<KeySlot, NUM_MACRO_KEYS> = heapless::Vec::new();
    for _ in 0..NUM_MACRO_KEYS {
        let header = data.get(offset..offset + 5)?;
        let label_len = header[4] as usize;
        if label_len > KEY_LABEL_LEN {
            return None;
        }
        let raw = data.get(offset + 5..offset + 5 + label_len)?;
        let mut label = String::new();
        label.push_str(core::str::from_utf8(raw).ok()?).ok()?;

        keys.push(KeySlot {
            macro_id: header[0],
            label,
            color: LedColor::new(header[1], header[2], header[3]),
        })
        .ok()?;
        offset += 5 + label_len;
    }

    Some(ProfileSnapshot {
        keys: keys.into_array().ok()?,
        encoder_mode,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::DeviceState;

    fn custom_snapshot() -> ProfileSnapshot {
        let mut snapshot = DeviceState::default().profile_snapshot();
        snapshot.encoder_mode = [EncoderMode::Timeline, EncoderMode::Scroll];
        snapshot.keys[4].macro_id = 42;
        snapshot.keys[4].label = String::try_from("Copy").unwrap();
        snapshot.keys[4].color = LedColor::new(1, 2, 3);
        snapshot
    }

    #[test]
    fn empty_cache_loads_nothing() {
        let mut cache = ProfileCache::new();
        assert_eq!(cache.load(1), Ok(None));
        assert!(!cache.is_dirty());
    }

    #[test]
    fn out_of_range_profile_is_an_error() {
        let mut cache = ProfileCache::new();
        assert_eq!(cache.load(0), Err(CacheError::NoSuchProfile(0)));
        assert_eq!(
            cache.save(9, &custom_snapshot()),
            Err(CacheError::NoSuchProfile(9))
        );
    }

    #[test]
    fn save_marks_slot_dirty_until_flushed() {
        let mut cache = ProfileCache::new();
        cache.save(3, &custom_snapshot()).unwrap();
        assert!(cache.is_dirty());
        assert_eq!(cache.dirty_profiles().collect::<Vec<_>>(), vec![3]);

        cache.mark_clean(3);
        assert!(!cache.is_dirty());
        assert_eq!(cache.load(3), Ok(Some(custom_snapshot())));
    }

    #[test]
    fn saving_identical_snapshot_stays_clean() {
        let mut cache = ProfileCache::new();
        cache.save(2, &custom_snapshot()).unwrap();
        cache.mark_clean(2);
        cache.save(2, &custom_snapshot()).unwrap();
        assert!(!cache.is_dirty());
    }

    #[test]
    fn flash_record_restores_into_another_cache() {
        let mut cache = ProfileCache::new();
        cache.save(5, &custom_snapshot()).unwrap();

        let mut buf = [0u8; MAX_PROFILE_RECORD];
        let n = cache.serialize_slot(5, &mut buf);
        assert!(n > 0);

        let mut restored = ProfileCache::new();
        assert!(restored.restore_slot(5, &buf[..n]));
        assert!(!restored.is_dirty());
        assert_eq!(restored.get(5), Some(&custom_snapshot()));
    }

    #[test]
    fn corrupt_records_are_rejected() {
        let mut buf = [0u8; MAX_PROFILE_RECORD];
        let n = encode_snapshot(&custom_snapshot(), &mut buf);

        assert!(decode_snapshot(&buf[..n - 1]).is_none());

        let mut bad_mode = buf;
        bad_mode[0] = 9;
        assert!(decode_snapshot(&bad_mode[..n]).is_none());

        let mut cache = ProfileCache::new();
        assert!(!cache.restore_slot(1, &buf[..3]));
        assert!(cache.get(1).is_none());
    }

    #[test]
    fn short_buffer_writes_nothing() {
        let mut buf = [0u8; 8];
        assert_eq!(encode_snapshot(&custom_snapshot(), &mut buf), 0);
        assert_eq!(ProfileCache::new().serialize_slot(1, &mut buf), 0);
    }
}
