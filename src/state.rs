use arrayref::{array_mut_ref, array_ref, array_refs, mut_array_refs};
use solana_program_error::ProgramError;
use solana_program_pack::{IsInitialized, Pack, Sealed};
use solana_pubkey::Pubkey;

use crate::error::EscrowError;

pub const ESCROW_SEED_PREFIX: &[u8] = b"escrow";

pub const UNIQUE_ID_LEN: usize = 20;

/// Lock phase of an escrow at a given moment. Derived from the unlock time
/// and the clock on every read; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Locked,
    Unlocked,
}

/// Seeds that, together with the owner, derive the escrow account address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EscrowId {
    pub unique_id: [u8; UNIQUE_ID_LEN],
    pub bump_seed: u8,
}

/// A single-owner time-locked escrow record.
///
/// `owner`, `unlock_time` and `id` are fixed at construction and have no
/// setters. `funds` only changes through [`crate::manager::EscrowManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Escrow {
    is_initialized: bool,
    id: EscrowId,
    owner: Pubkey,
    unlock_time: i64,
    funds: u64,
}

impl Escrow {
    pub(crate) fn new(id: EscrowId, owner: Pubkey, unlock_time: i64, funds: u64) -> Self {
        Self {
            is_initialized: true,
            id,
            owner,
            unlock_time,
            funds,
        }
    }

    pub(crate) fn set_funds(&mut self, funds: u64) {
        self.funds = funds;
    }

    pub fn id(&self) -> &EscrowId {
        &self.id
    }

    pub fn owner(&self) -> &Pubkey {
        &self.owner
    }

    /// Milliseconds since the Unix epoch.
    pub fn unlock_time(&self) -> i64 {
        self.unlock_time
    }

    pub fn balance(&self) -> u64 {
        self.funds
    }

    pub fn is_unlocked(&self, current_time: i64) -> bool {
        current_time >= self.unlock_time
    }

    pub fn phase(&self, current_time: i64) -> Phase {
        if self.is_unlocked(current_time) {
            Phase::Unlocked
        } else {
            Phase::Locked
        }
    }

    /// Milliseconds left until unlock, zero once unlocked.
    pub fn time_until_unlock(&self, current_time: i64) -> u64 {
        if self.is_unlocked(current_time) {
            0
        } else {
            self.unlock_time.abs_diff(current_time)
        }
    }

    pub fn find_address(
        program_id: &Pubkey,
        owner: &Pubkey,
        unique_id: &[u8; UNIQUE_ID_LEN],
    ) -> (Pubkey, u8) {
        Pubkey::find_program_address(&[ESCROW_SEED_PREFIX, owner.as_ref(), unique_id], program_id)
    }

    /// Re-derives the account address from the stored seeds.
    pub fn address(&self, program_id: &Pubkey) -> Result<Pubkey, ProgramError> {
        Pubkey::create_program_address(
            &[
                ESCROW_SEED_PREFIX,
                self.owner.as_ref(),
                &self.id.unique_id,
                &[self.id.bump_seed],
            ],
            program_id,
        )
        .map_err(|_| EscrowError::InvalidEscrowAddress.into())
    }
}

impl Sealed for Escrow {}

impl IsInitialized for Escrow {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl Pack for Escrow {
    // 1 + 32 + 8 + 8 + 20 + 1
    const LEN: usize = 70;

    fn pack_into_slice(&self, dst: &mut [u8]) {
        let dst = array_mut_ref![dst, 0, 70];
        let (is_initialized_dst, owner_dst, unlock_time_dst, funds_dst, unique_id_dst, bump_seed_dst) =
            mut_array_refs![dst, 1, 32, 8, 8, UNIQUE_ID_LEN, 1];
        is_initialized_dst[0] = self.is_initialized as u8;
        owner_dst.copy_from_slice(self.owner.as_ref());
        *unlock_time_dst = self.unlock_time.to_le_bytes();
        *funds_dst = self.funds.to_le_bytes();
        *unique_id_dst = self.id.unique_id;
        bump_seed_dst[0] = self.id.bump_seed;
    }

    fn unpack_from_slice(src: &[u8]) -> Result<Self, ProgramError> {
        let src = array_ref![src, 0, 70];
        let (is_initialized, owner, unlock_time, funds, unique_id, bump_seed) =
            array_refs![src, 1, 32, 8, 8, UNIQUE_ID_LEN, 1];
        let is_initialized = match is_initialized {
            [0] => false,
            [1] => true,
            _ => return Err(ProgramError::InvalidAccountData),
        };
        Ok(Escrow {
            is_initialized,
            id: EscrowId {
                unique_id: *unique_id,
                bump_seed: bump_seed[0],
            },
            owner: Pubkey::new_from_array(*owner),
            unlock_time: i64::from_le_bytes(*unlock_time),
            funds: u64::from_le_bytes(*funds),
        })
    }
}
