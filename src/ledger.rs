use solana_account_info::AccountInfo;
use solana_program::{program::invoke, system_instruction, system_program};
use solana_program_entrypoint::ProgramResult;
use solana_program_error::ProgramError;
use solana_pubkey::Pubkey;

/// Moves the escrowed asset between outside accounts and record custody.
///
/// Implementations must conserve value: custody grows by exactly the amount
/// collected and shrinks by exactly the amount disbursed.
pub trait AssetLedger {
    /// Pulls `amount` from `from` into custody.
    fn collect(&mut self, from: &Pubkey, amount: u64) -> ProgramResult;

    /// Splits `amount` out of custody and pays it to `to`.
    fn disburse(&mut self, to: &Pubkey, amount: u64) -> ProgramResult;
}

/// Lamport custody held directly in the program-owned escrow account.
pub struct LamportLedger<'a, 'info> {
    escrow_account: &'a AccountInfo<'info>,
    counterparty: &'a AccountInfo<'info>,
    system_program: Option<&'a AccountInfo<'info>>,
}

impl<'a, 'info> LamportLedger<'a, 'info> {
    /// Ledger that can only pay out of custody.
    pub fn new(escrow_account: &'a AccountInfo<'info>, counterparty: &'a AccountInfo<'info>) -> Self {
        Self {
            escrow_account,
            counterparty,
            system_program: None,
        }
    }

    /// Ledger that can also pull from the counterparty through the system program.
    pub fn with_system_program(
        escrow_account: &'a AccountInfo<'info>,
        counterparty: &'a AccountInfo<'info>,
        system_program: &'a AccountInfo<'info>,
    ) -> Result<Self, ProgramError> {
        if !system_program::check_id(system_program.key) {
            return Err(ProgramError::IncorrectProgramId);
        }
        Ok(Self {
            escrow_account,
            counterparty,
            system_program: Some(system_program),
        })
    }

    fn check_counterparty(&self, key: &Pubkey) -> ProgramResult {
        if self.counterparty.key != key {
            return Err(ProgramError::InvalidAccountData);
        }
        Ok(())
    }
}

impl AssetLedger for LamportLedger<'_, '_> {
    fn collect(&mut self, from: &Pubkey, amount: u64) -> ProgramResult {
        self.check_counterparty(from)?;
        if amount == 0 {
            return Ok(());
        }
        let system_program = self.system_program.ok_or(ProgramError::NotEnoughAccountKeys)?;

        invoke(
            &system_instruction::transfer(self.counterparty.key, self.escrow_account.key, amount),
            &[
                self.counterparty.clone(),
                self.escrow_account.clone(),
                system_program.clone(),
            ],
        )
    }

    fn disburse(&mut self, to: &Pubkey, amount: u64) -> ProgramResult {
        self.check_counterparty(to)?;
        if amount == 0 {
            return Ok(());
        }

        let escrow_lamports = self
            .escrow_account
            .lamports()
            .checked_sub(amount)
            .ok_or(ProgramError::InsufficientFunds)?;
        let counterparty_lamports = self
            .counterparty
            .lamports()
            .checked_add(amount)
            .ok_or(ProgramError::ArithmeticOverflow)?;

        **self.escrow_account.try_borrow_mut_lamports()? = escrow_lamports;
        **self.counterparty.try_borrow_mut_lamports()? = counterparty_lamports;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod memory {
    use std::collections::HashMap;

    use super::*;

    /// In-memory ledger: per-account balances plus a single custody pot.
    #[derive(Debug, Default)]
    pub(crate) struct MemoryLedger {
        balances: HashMap<Pubkey, u64>,
        custody: u64,
    }

    impl MemoryLedger {
        pub(crate) fn fund(&mut self, account: &Pubkey, amount: u64) {
            *self.balances.entry(*account).or_default() += amount;
        }

        pub(crate) fn balance_of(&self, account: &Pubkey) -> u64 {
            self.balances.get(account).copied().unwrap_or_default()
        }

        pub(crate) fn custody(&self) -> u64 {
            self.custody
        }

        pub(crate) fn total(&self) -> u128 {
            self.balances.values().map(|v| *v as u128).sum::<u128>() + self.custody as u128
        }
    }

    impl AssetLedger for MemoryLedger {
        fn collect(&mut self, from: &Pubkey, amount: u64) -> ProgramResult {
            let balance = self.balances.entry(*from).or_default();
            *balance = balance.checked_sub(amount).ok_or(ProgramError::InsufficientFunds)?;
            self.custody = self.custody.checked_add(amount).ok_or(ProgramError::ArithmeticOverflow)?;
            Ok(())
        }

        fn disburse(&mut self, to: &Pubkey, amount: u64) -> ProgramResult {
            self.custody = self.custody.checked_sub(amount).ok_or(ProgramError::InsufficientFunds)?;
            *self.balances.entry(*to).or_default() += amount;
            Ok(())
        }
    }
}
