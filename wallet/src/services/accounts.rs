//! Account and wallet orchestration: user sync, account creation with the
//! brokerage pairing, and the account listing.

use crate::{
    db::{
        enums::{AccountType, Currency},
        models::{
            banks::Bank,
            brokerage::BrokerageAccount,
            deposits::{
                BrokerageDepositLink, DepositAccount, DepositAccountBalance, DepositCreateOutcome,
                NewDepositAccount,
            },
            transactions::Transaction,
            users::User,
            wallets::Wallet,
        },
    },
    error::WalletError,
    services::secure::SecretBox,
};
use diesel_async::AsyncPgConnection;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize)]
pub struct AccountWithActivity {
    pub account: DepositAccount,
    pub balance: Option<DepositAccountBalance>,
    pub last_transactions: Vec<Transaction>,
}

#[derive(Clone, Debug, Serialize)]
pub struct WalletWithAccounts {
    pub wallet: Wallet,
    pub accounts: Vec<AccountWithActivity>,
}

#[derive(Clone, Debug, Serialize)]
pub struct UserSyncOut {
    pub user: User,
    pub wallets: Vec<WalletWithAccounts>,
    pub banks: Vec<Bank>,
}

/// Upserts the user and returns their wallets with accounts, balances and the
/// five most recent transactions per account, plus the bank list.
pub async fn sync_user(
    conn: &mut AsyncPgConnection,
    user_id: Uuid,
    email: Option<&str>,
) -> Result<UserSyncOut, WalletError> {
    let user = User::upsert(conn, user_id, email).await?;

    let mut wallets_out = vec![];
    for wallet in Wallet::list_for_user(conn, user_id).await? {
        let mut accounts = vec![];
        for account in DepositAccount::list_for_wallets(conn, &[wallet.id]).await? {
            let balance = DepositAccountBalance::get(conn, account.id).await?;
            let last_transactions = Transaction::last_for_account(conn, account.id, 5).await?;
            accounts.push(AccountWithActivity {
                account,
                balance,
                last_transactions,
            });
        }
        wallets_out.push(WalletWithAccounts {
            wallet,
            accounts,
        });
    }

    let banks = Bank::list(conn).await?;
    Ok(UserSyncOut {
        user,
        wallets: wallets_out,
        banks,
    })
}

#[derive(Clone, Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub name: String,
    pub account_type: AccountType,
    pub currency: Currency,
    pub account_number: String,
    pub bank_id: Uuid,
    #[serde(default)]
    pub iban: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct CreateAccountOut {
    pub account: DepositAccount,
    pub brokerage_account: Option<BrokerageAccount>,
}

/// Creates a deposit account in the wallet. A brokerage-typed account also
/// gets its paired brokerage account and the settlement link; the caller's
/// transaction rolls the pair back together on failure.
pub async fn create_account(
    conn: &mut AsyncPgConnection,
    secrets: &SecretBox,
    user_id: Uuid,
    wallet_id: Uuid,
    req: &CreateAccountRequest,
) -> Result<CreateAccountOut, WalletError> {
    let wallet = Wallet::find_owned(conn, user_id, wallet_id)
        .await?
        .ok_or_else(|| WalletError::NotFound("Wallet not found".to_string()))?;
    let bank = Bank::find(conn, req.bank_id)
        .await?
        .ok_or_else(|| WalletError::NotFound("Bank not found".to_string()))?;

    let account_number = req.account_number.trim();
    if account_number.is_empty() {
        return Err(WalletError::Validation(
            "Account number must not be empty".to_string(),
        ));
    }

    let row = NewDepositAccount {
        wallet_id: wallet.id,
        bank_id: bank.id,
        name: req.name.trim().to_string(),
        account_type: req.account_type,
        currency: req.currency,
        account_number_enc: secrets.encrypt(account_number)?,
        account_number_fp: secrets.fingerprint(account_number),
        iban_enc: req
            .iban
            .as_deref()
            .map(|iban| secrets.encrypt(iban))
            .transpose()?,
        iban_fp: req.iban.as_deref().map(|iban| secrets.fingerprint(iban)),
    };

    let account = match DepositAccount::create(conn, row).await? {
        DepositCreateOutcome::Created(account) => account,
        DepositCreateOutcome::Duplicate => {
            return Err(WalletError::Conflict(
                "An account with this number already exists in the wallet".to_string(),
            ))
        },
    };

    let brokerage_account = if req.account_type == AccountType::Brokerage {
        let brokerage =
            BrokerageAccount::create(conn, wallet.id, bank.id, &format!("{} (brokerage)", req.name))
                .await?;
        BrokerageDepositLink::create(conn, brokerage.id, account.id, req.currency).await?;
        info!(
            brokerage_account_id = %brokerage.id,
            deposit_account_id = %account.id,
            "Paired brokerage account created"
        );
        Some(brokerage)
    } else {
        None
    };

    Ok(CreateAccountOut {
        account,
        brokerage_account,
    })
}

#[derive(Clone, Debug, Serialize)]
pub struct AccountListItem {
    pub account: DepositAccount,
    pub balance: Option<DepositAccountBalance>,
    pub bank_name: Option<String>,
}

/// Lists the user's accounts, optionally filtered by name substring or bank.
pub async fn list_accounts(
    conn: &mut AsyncPgConnection,
    user_id: Uuid,
    q: Option<&str>,
    bank_id: Option<Uuid>,
) -> Result<Vec<AccountListItem>, WalletError> {
    // The bank join is only materialized when something requests bank data.
    let mut join_bank = false;
    if bank_id.is_some() {
        join_bank = true;
    }
    let needle = q.map(|q| q.trim().to_lowercase()).filter(|q| !q.is_empty());
    if needle.is_some() {
        // Name search output includes the bank name for disambiguation.
        join_bank = true;
    }

    let wallet_ids: Vec<Uuid> = Wallet::list_for_user(conn, user_id)
        .await?
        .iter()
        .map(|w| w.id)
        .collect();

    let mut out = vec![];
    for account in DepositAccount::list_for_wallets(conn, &wallet_ids).await? {
        if let Some(bank_id) = bank_id {
            if account.bank_id != bank_id {
                continue;
            }
        }
        if let Some(needle) = &needle {
            if !account.name.to_lowercase().contains(needle) {
                continue;
            }
        }
        let balance = DepositAccountBalance::get(conn, account.id).await?;
        let bank_name = if join_bank {
            Bank::find(conn, account.bank_id).await?.map(|b| b.name)
        } else {
            None
        };
        out.push(AccountListItem {
            account,
            balance,
            bank_name,
        });
    }
    Ok(out)
}
