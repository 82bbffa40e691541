use solana_account_info::{next_account_info, AccountInfo};
use solana_program::{
    msg,
    program::{invoke, invoke_signed},
    system_instruction, system_program,
    sysvar::{clock::Clock, rent::Rent, Sysvar},
};
use solana_program_entrypoint::ProgramResult;
use solana_program_error::ProgramError;
use solana_program_pack::Pack;
use solana_pubkey::Pubkey;

use crate::{
    error::EscrowError,
    instruction::EscrowInstruction,
    ledger::LamportLedger,
    manager::EscrowManager,
    state::{Escrow, EscrowId, ESCROW_SEED_PREFIX, UNIQUE_ID_LEN},
};

pub const MILLIS_PER_SECOND: i64 = 1_000;

pub struct Processor;

impl Processor {
    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = EscrowInstruction::unpack(instruction_data)?;

        match instruction {
            EscrowInstruction::Create {
                owner,
                unique_id,
                unlock_time,
                amount,
            } => Self::process_create(program_id, accounts, owner, unique_id, unlock_time, amount),
            EscrowInstruction::Deposit { amount } => {
                Self::process_deposit(program_id, accounts, amount)
            }
            EscrowInstruction::Withdraw => Self::process_withdraw(program_id, accounts),
            EscrowInstruction::WithdrawPartial { amount } => {
                Self::process_withdraw_partial(program_id, accounts, amount)
            }
            EscrowInstruction::Cancel => Self::process_cancel(program_id, accounts),
        }
    }

    fn process_create(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        owner: Pubkey,
        unique_id: [u8; UNIQUE_ID_LEN],
        unlock_time: i64,
        amount: u64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let depositor = next_account_info(account_info_iter)?;
        let escrow_account = next_account_info(account_info_iter)?;
        let system_program = next_account_info(account_info_iter)?;
        let rent = &Rent::from_account_info(next_account_info(account_info_iter)?)?;
        let current_time = clock_millis(next_account_info(account_info_iter)?)?;

        if !depositor.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }

        let (address, bump_seed) = Escrow::find_address(program_id, &owner, &unique_id);
        if address != *escrow_account.key {
            return Err(EscrowError::InvalidEscrowAddress.into());
        }
        if !escrow_account.data_is_empty() || !system_program::check_id(escrow_account.owner) {
            return Err(EscrowError::EscrowAlreadyExists.into());
        }

        let id = EscrowId {
            unique_id,
            bump_seed,
        };
        let ledger = LamportLedger::with_system_program(escrow_account, depositor, system_program)?;
        let escrow = EscrowManager::new(ledger).create(
            depositor.key,
            owner,
            id,
            unlock_time,
            amount,
            current_time,
        )?;

        // The address may already hold stray lamports, so top up to the
        // rent reserve and take it over with allocate + assign.
        let required = rent
            .minimum_balance(Escrow::LEN)
            .checked_add(amount)
            .ok_or(EscrowError::AmountOverflow)?;
        let shortfall = required.saturating_sub(escrow_account.lamports());
        if shortfall > 0 {
            invoke(
                &system_instruction::transfer(depositor.key, escrow_account.key, shortfall),
                &[
                    depositor.clone(),
                    escrow_account.clone(),
                    system_program.clone(),
                ],
            )?;
        }

        let bump = [bump_seed];
        let signer_seeds: &[&[u8]] = &[ESCROW_SEED_PREFIX, owner.as_ref(), &unique_id, &bump];
        invoke_signed(
            &system_instruction::allocate(escrow_account.key, Escrow::LEN as u64),
            &[escrow_account.clone(), system_program.clone()],
            &[signer_seeds],
        )?;
        invoke_signed(
            &system_instruction::assign(escrow_account.key, program_id),
            &[escrow_account.clone(), system_program.clone()],
            &[signer_seeds],
        )?;

        Escrow::pack(escrow, &mut escrow_account.try_borrow_mut_data()?)?;
        msg!("Escrow created: {}", escrow_account.key);
        msg!("Owner: {}, unlock time: {}, funds: {}", owner, unlock_time, amount);
        Ok(())
    }

    fn process_deposit(program_id: &Pubkey, accounts: &[AccountInfo], amount: u64) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let caller = next_account_info(account_info_iter)?;
        let escrow_account = next_account_info(account_info_iter)?;
        let system_program = next_account_info(account_info_iter)?;

        if !caller.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut escrow = load_escrow(program_id, escrow_account)?;
        let ledger = LamportLedger::with_system_program(escrow_account, caller, system_program)?;
        EscrowManager::new(ledger).deposit(&mut escrow, amount, caller.key)?;

        msg!("Amount deposited: {}, balance: {}", amount, escrow.balance());
        Escrow::pack(escrow, &mut escrow_account.try_borrow_mut_data()?)?;
        Ok(())
    }

    fn process_withdraw(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let caller = next_account_info(account_info_iter)?;
        let escrow_account = next_account_info(account_info_iter)?;
        let current_time = clock_millis(next_account_info(account_info_iter)?)?;

        if !caller.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }

        let escrow = load_escrow(program_id, escrow_account)?;
        let ledger = LamportLedger::new(escrow_account, caller);
        let amount = EscrowManager::new(ledger).withdraw_full(escrow, caller.key, current_time)?;

        close_escrow_account(escrow_account, caller)?;
        msg!("Escrow withdrawn: {}, paid out: {}", escrow_account.key, amount);
        Ok(())
    }

    fn process_withdraw_partial(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        amount: u64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let caller = next_account_info(account_info_iter)?;
        let escrow_account = next_account_info(account_info_iter)?;
        let current_time = clock_millis(next_account_info(account_info_iter)?)?;

        if !caller.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut escrow = load_escrow(program_id, escrow_account)?;
        let ledger = LamportLedger::new(escrow_account, caller);
        EscrowManager::new(ledger).withdraw_partial(&mut escrow, amount, caller.key, current_time)?;

        msg!("Amount withdrawn: {}, balance: {}", amount, escrow.balance());
        Escrow::pack(escrow, &mut escrow_account.try_borrow_mut_data()?)?;
        Ok(())
    }

    fn process_cancel(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let caller = next_account_info(account_info_iter)?;
        let escrow_account = next_account_info(account_info_iter)?;
        let current_time = clock_millis(next_account_info(account_info_iter)?)?;

        if !caller.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }

        let escrow = load_escrow(program_id, escrow_account)?;
        let ledger = LamportLedger::new(escrow_account, caller);
        let amount = EscrowManager::new(ledger).cancel(escrow, caller.key, current_time)?;

        close_escrow_account(escrow_account, caller)?;
        msg!("Escrow cancelled: {}, refunded: {}", escrow_account.key, amount);
        Ok(())
    }
}

/// Current time in milliseconds from the clock sysvar account.
fn clock_millis(clock_account: &AccountInfo) -> Result<i64, ProgramError> {
    let clock = Clock::from_account_info(clock_account)?;
    clock
        .unix_timestamp
        .checked_mul(MILLIS_PER_SECOND)
        .ok_or(ProgramError::InvalidArgument)
}

fn load_escrow(program_id: &Pubkey, escrow_account: &AccountInfo) -> Result<Escrow, ProgramError> {
    // Closed or never created.
    if escrow_account.data_is_empty() {
        return Err(ProgramError::UninitializedAccount);
    }
    if escrow_account.owner != program_id {
        return Err(ProgramError::IncorrectProgramId);
    }

    let escrow = Escrow::unpack(&escrow_account.try_borrow_data()?)?;
    if escrow.address(program_id)? != *escrow_account.key {
        return Err(EscrowError::InvalidEscrowAddress.into());
    }
    Ok(escrow)
}

/// Moves every remaining lamport, rent reserve included, to `destination`
/// and wipes the record so the account is reclaimed at the end of the
/// transaction.
fn close_escrow_account(escrow_account: &AccountInfo, destination: &AccountInfo) -> ProgramResult {
    let destination_lamports = destination
        .lamports()
        .checked_add(escrow_account.lamports())
        .ok_or(ProgramError::ArithmeticOverflow)?;

    **escrow_account.try_borrow_mut_lamports()? = 0;
    **destination.try_borrow_mut_lamports()? = destination_lamports;
    escrow_account.try_borrow_mut_data()?.fill(0);
    Ok(())
}
