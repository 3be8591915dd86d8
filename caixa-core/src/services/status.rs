//! Settlement status annotation for import candidates

use std::collections::HashMap;

use uuid::Uuid;

use crate::domain::{detect_default_status, Account, ImportedTransaction, SettlementStatus};

/// Annotated copies carrying each owning account's default status
///
/// Candidates whose account is missing or unknown get `Realizado`.
pub fn annotate_statuses(
    candidates: &[ImportedTransaction],
    accounts: &[Account],
) -> Vec<ImportedTransaction> {
    let defaults: HashMap<Uuid, SettlementStatus> = accounts
        .iter()
        .map(|account| (account.id, detect_default_status(&account.account_type)))
        .collect();

    candidates
        .iter()
        .map(|tx| {
            let status = tx
                .account_id
                .and_then(|id| defaults.get(&id).copied())
                .unwrap_or(SettlementStatus::Realizado);
            tx.with_status(status)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::*;
    use crate::domain::{AccountType, TransactionKind};

    fn candidate(account_id: Uuid) -> ImportedTransaction {
        ImportedTransaction::new(
            NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            Decimal::new(1000, 2),
            "COMPRA",
            account_id,
            TransactionKind::Despesa,
        )
    }

    #[test]
    fn test_every_candidate_gets_exactly_one_status() {
        let card = Account::new(Uuid::new_v4(), "Nubank", AccountType::CartaoCredito);
        let checking = Account::new(Uuid::new_v4(), "Itaú", AccountType::ContaCorrente);
        let mut orphan = candidate(Uuid::new_v4());
        orphan.account_id = None;

        let annotated = annotate_statuses(
            &[candidate(card.id), candidate(checking.id), candidate(Uuid::new_v4()), orphan],
            &[card, checking],
        );

        let statuses: Vec<_> = annotated.iter().map(|tx| tx.status).collect();
        assert_eq!(
            statuses,
            vec![
                Some(SettlementStatus::Previsto),
                Some(SettlementStatus::Realizado),
                Some(SettlementStatus::Realizado),
                Some(SettlementStatus::Realizado),
            ]
        );
    }
}
