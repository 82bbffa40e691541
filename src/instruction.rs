use borsh::{BorshDeserialize, BorshSerialize};
use solana_instruction::{AccountMeta, Instruction};
use solana_program::{system_program, sysvar};
use solana_program_error::ProgramError;
use solana_pubkey::Pubkey;

use crate::{error::EscrowError, state::UNIQUE_ID_LEN};

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub enum EscrowInstruction {
    /// Open an escrow for `owner`, funded by the depositor.
    ///
    /// Accounts:
    /// 0. `[signer, writable]` depositor
    /// 1. `[writable]` escrow PDA for `owner` and `unique_id`
    /// 2. `[]` system program
    /// 3. `[]` rent sysvar
    /// 4. `[]` clock sysvar
    Create {
        owner: Pubkey,
        unique_id: [u8; UNIQUE_ID_LEN],
        /// Milliseconds since the Unix epoch.
        unlock_time: i64,
        amount: u64,
    },

    /// Add funds. Allowed before and after unlock.
    ///
    /// Accounts:
    /// 0. `[signer, writable]` owner
    /// 1. `[writable]` escrow
    /// 2. `[]` system program
    Deposit { amount: u64 },

    /// Pay out everything and close the escrow once unlocked.
    ///
    /// Accounts:
    /// 0. `[signer, writable]` owner
    /// 1. `[writable]` escrow
    /// 2. `[]` clock sysvar
    Withdraw,

    /// Pay out part of the balance once unlocked.
    ///
    /// Accounts: same as `Withdraw`.
    WithdrawPartial { amount: u64 },

    /// Return everything to the owner and close the escrow before unlock.
    ///
    /// Accounts: same as `Withdraw`.
    Cancel,
}

impl EscrowInstruction {
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        Self::try_from_slice(input).map_err(|_| EscrowError::InvalidInstruction.into())
    }

    pub fn pack(&self) -> Result<Vec<u8>, ProgramError> {
        self.try_to_vec()
            .map_err(|_| EscrowError::InvalidInstruction.into())
    }
}

pub fn create(
    program_id: &Pubkey,
    depositor: &Pubkey,
    escrow_account: &Pubkey,
    owner: &Pubkey,
    unique_id: [u8; UNIQUE_ID_LEN],
    unlock_time: i64,
    amount: u64,
) -> Result<Instruction, ProgramError> {
    let accounts = vec![
        AccountMeta::new(*depositor, true),
        AccountMeta::new(*escrow_account, false),
        AccountMeta::new_readonly(system_program::id(), false),
        AccountMeta::new_readonly(sysvar::rent::id(), false),
        AccountMeta::new_readonly(sysvar::clock::id(), false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data: EscrowInstruction::Create {
            owner: *owner,
            unique_id,
            unlock_time,
            amount,
        }
        .pack()?,
    })
}

pub fn deposit(
    program_id: &Pubkey,
    owner: &Pubkey,
    escrow_account: &Pubkey,
    amount: u64,
) -> Result<Instruction, ProgramError> {
    let accounts = vec![
        AccountMeta::new(*owner, true),
        AccountMeta::new(*escrow_account, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data: EscrowInstruction::Deposit { amount }.pack()?,
    })
}

pub fn withdraw(
    program_id: &Pubkey,
    owner: &Pubkey,
    escrow_account: &Pubkey,
) -> Result<Instruction, ProgramError> {
    owner_instruction(program_id, owner, escrow_account, EscrowInstruction::Withdraw)
}

pub fn withdraw_partial(
    program_id: &Pubkey,
    owner: &Pubkey,
    escrow_account: &Pubkey,
    amount: u64,
) -> Result<Instruction, ProgramError> {
    owner_instruction(
        program_id,
        owner,
        escrow_account,
        EscrowInstruction::WithdrawPartial { amount },
    )
}

pub fn cancel(
    program_id: &Pubkey,
    owner: &Pubkey,
    escrow_account: &Pubkey,
) -> Result<Instruction, ProgramError> {
    owner_instruction(program_id, owner, escrow_account, EscrowInstruction::Cancel)
}

// Withdraw, WithdrawPartial and Cancel share one account list.
fn owner_instruction(
    program_id: &Pubkey,
    owner: &Pubkey,
    escrow_account: &Pubkey,
    instruction: EscrowInstruction,
) -> Result<Instruction, ProgramError> {
    let accounts = vec![
        AccountMeta::new(*owner, true),
        AccountMeta::new(*escrow_account, false),
        AccountMeta::new_readonly(sysvar::clock::id(), false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data: instruction.pack()?,
    })
}
