//! Pre-built Test Fixtures
//!
//! A small clinic catalog, one actor per role, and an in-memory ledger wired
//! into a `BillingService`.

use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

use core_kernel::{Actor, Currency, Money, PatientId, Role, ServiceItemId, UserId, VisitId};
use domain_billing::adapters::{InMemoryCatalog, InMemoryLedgerStore};
use domain_billing::{BillingPolicy, BillingService, CatalogItem};

/// Creates a PHP amount
pub fn php(amount: Decimal) -> Money {
    Money::new(amount, Currency::PHP)
}

static STANDARD_CATALOG: Lazy<Vec<CatalogItem>> = Lazy::new(|| {
    vec![
        CatalogItem::new(CatalogFixtures::CONSULTATION, "General consultation", php(dec!(300.00))),
        CatalogItem::new(CatalogFixtures::CBC, "Complete blood count", php(dec!(100.00))),
        CatalogItem::new(CatalogFixtures::XRAY, "Chest X-ray", php(dec!(450.00))),
        CatalogItem::new(CatalogFixtures::URINALYSIS, "Urinalysis", php(dec!(85.50))),
        CatalogItem::new(CatalogFixtures::MEDICAL_CERT, "Medical certificate", php(dec!(0.00))),
        CatalogItem::new(CatalogFixtures::ULTRASOUND, "Abdominal ultrasound", php(dec!(1200.00)))
            .inactive(),
        CatalogItem::new(CatalogFixtures::MISPRICED, "Promo adjustment", php(dec!(-50.00))),
    ]
});

/// Fixture catalog of clinic services
pub struct CatalogFixtures;

impl CatalogFixtures {
    pub const CONSULTATION: ServiceItemId = ServiceItemId::new(1);
    pub const CBC: ServiceItemId = ServiceItemId::new(2);
    pub const XRAY: ServiceItemId = ServiceItemId::new(3);
    pub const URINALYSIS: ServiceItemId = ServiceItemId::new(4);
    /// Zero-priced
    pub const MEDICAL_CERT: ServiceItemId = ServiceItemId::new(5);
    /// Inactive
    pub const ULTRASOUND: ServiceItemId = ServiceItemId::new(6);
    /// Negative price, never billable
    pub const MISPRICED: ServiceItemId = ServiceItemId::new(7);
    /// Not in the catalog at all
    pub const UNKNOWN: ServiceItemId = ServiceItemId::new(999);

    /// All fixture items, including the unbillable ones
    pub fn standard() -> Vec<CatalogItem> {
        STANDARD_CATALOG.clone()
    }

    pub fn item(id: ServiceItemId) -> Option<CatalogItem> {
        STANDARD_CATALOG.iter().find(|item| item.id == id).cloned()
    }
}

/// One actor per clinic role
pub struct ActorFixtures;

impl ActorFixtures {
    pub fn admin() -> Actor {
        Actor::new(UserId::new(1), Role::Admin)
    }

    pub fn cashier() -> Actor {
        Actor::new(UserId::new(2), Role::Cashier)
    }

    pub fn billing_clerk() -> Actor {
        Actor::new(UserId::new(3), Role::BillingClerk)
    }

    pub fn receptionist() -> Actor {
        Actor::new(UserId::new(4), Role::Receptionist)
    }

    pub fn doctor() -> Actor {
        Actor::new(UserId::new(5), Role::Doctor)
    }

    pub fn nurse() -> Actor {
        Actor::new(UserId::new(6), Role::Nurse)
    }
}

/// Clinic record references
pub struct IdFixtures;

impl IdFixtures {
    pub fn patient() -> PatientId {
        PatientId::new(1001)
    }

    pub fn other_patient() -> PatientId {
        PatientId::new(1002)
    }

    pub fn visit() -> VisitId {
        VisitId::new(5001)
    }
}

/// A `BillingService` over in-memory adapters, with handles kept for
/// inspection and fault injection
pub struct TestLedger {
    pub service: Arc<BillingService>,
    pub store: Arc<InMemoryLedgerStore>,
    pub catalog: Arc<InMemoryCatalog>,
}

impl TestLedger {
    /// Standard catalog under the default policy
    pub fn new() -> Self {
        Self::with_policy(BillingPolicy::default())
    }

    pub fn with_policy(policy: BillingPolicy) -> Self {
        let store = Arc::new(InMemoryLedgerStore::new());
        let catalog = Arc::new(InMemoryCatalog::with_items(CatalogFixtures::standard()));
        let service = Arc::new(BillingService::new(store.clone(), catalog.clone(), policy));

        Self {
            service,
            store,
            catalog,
        }
    }
}

impl Default for TestLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_fixture_lookup() {
        let consult = CatalogFixtures::item(CatalogFixtures::CONSULTATION).unwrap();
        assert_eq!(consult.unit_price.amount(), dec!(300.00));
        assert!(consult.is_billable());

        assert!(!CatalogFixtures::item(CatalogFixtures::ULTRASOUND).unwrap().is_billable());
        assert!(!CatalogFixtures::item(CatalogFixtures::MISPRICED).unwrap().is_billable());
        assert!(CatalogFixtures::item(CatalogFixtures::UNKNOWN).is_none());
    }
}
