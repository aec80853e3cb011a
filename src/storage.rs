//! Persistent storage for per-profile key maps and encoder modes.
//!
//! Uses the nRF52840's internal flash via the `sequential-storage` crate.
//! The in-memory `ProfileCache` is the source of truth while running;
//! this module only moves its slots to and from flash.
//!
//! Storage layout:
//!   - One map item per profile, keyed by the profile number (1..=8).
//!   - Each value is the encoded `ProfileSnapshot` (see
//!     `padcore::persistence::encode_snapshot`).
//!   - `sequential-storage` handles wear levelling and GC over the pages.

use defmt::{debug, error, info};
use embedded_storage_async::nor_flash::NorFlash;
use heapless::Vec;
use padcore::config::{
    PROFILE_COUNT, PROFILE_MAX, PROFILE_MIN, STORAGE_FLASH_PAGE_COUNT, STORAGE_FLASH_PAGE_START,
};
use padcore::persistence::MAX_PROFILE_RECORD;
use padcore::ProfileCache;
use sequential_storage::cache::NoCache;

/// Flash page size for nRF52840 (4 KB).
const FLASH_PAGE_SIZE: u32 = 4096;

/// Start address of our storage region.
const STORAGE_START: u32 = STORAGE_FLASH_PAGE_START * FLASH_PAGE_SIZE;

/// End address (exclusive) of our storage region.
const STORAGE_END: u32 = (STORAGE_FLASH_PAGE_START + STORAGE_FLASH_PAGE_COUNT) * FLASH_PAGE_SIZE;

/// Scratch size for one map item: record plus key and item header.
const ITEM_BUF_SIZE: usize = MAX_PROFILE_RECORD + 16;

/// Fill every cache slot that has a record in flash.
///
/// Missing or corrupt records leave the slot empty; the profile then
/// keeps whatever the device record holds when it is entered.
pub async fn load_profiles(cache: &mut ProfileCache, flash: &mut impl NorFlash) {
    let mut buf = [0u8; ITEM_BUF_SIZE];
    let mut loaded = 0u8;

    for profile in PROFILE_MIN..=PROFILE_MAX {
        match sequential_storage::map::fetch_item::<u8, &[u8], _>(
            flash,
            STORAGE_START..STORAGE_END,
            &mut NoCache::new(),
            &mut buf,
            &profile,
        )
        .await
        {
            Ok(Some(data)) => {
                if cache.restore_slot(profile, data) {
                    loaded += 1;
                }
            }
            Ok(None) => debug!("No record for profile {}", profile),
            Err(e) => {
                error!(
                    "Flash read error (profile {}): {:?}",
                    profile,
                    defmt::Debug2Format(&e)
                );
            }
        }
    }

    info!("Loaded {} profile(s) from flash", loaded);
}

/// Write every dirty slot back to flash.
///
/// Slots that fail to store stay dirty and are retried on the next flush.
pub async fn flush_profiles(cache: &mut ProfileCache, flash: &mut impl NorFlash) {
    if !cache.is_dirty() {
        debug!("ProfileCache: no changes to save");
        return;
    }

    let dirty: Vec<u8, PROFILE_COUNT> = cache.dirty_profiles().collect();
    let mut buf = [0u8; ITEM_BUF_SIZE];
    let mut record = [0u8; MAX_PROFILE_RECORD];

    for profile in dirty {
        let len = cache.serialize_slot(profile, &mut record);
        if len == 0 {
            cache.mark_clean(profile);
            continue;
        }
        let item = &record[..len];

        match sequential_storage::map::store_item::<u8, &[u8], _>(
            flash,
            STORAGE_START..STORAGE_END,
            &mut NoCache::new(),
            &mut buf,
            &profile,
            &item,
        )
        .await
        {
            Ok(_) => {
                info!("Saved profile {} ({} bytes)", profile, len);
                cache.mark_clean(profile);
            }
            Err(e) => {
                error!(
                    "Flash write error (profile {}): {:?}",
                    profile,
                    defmt::Debug2Format(&e)
                );
            }
        }
    }
}
