//! Сводка по паллетам ("резюме") - производные агрегаты для дашборда.
//! Кэшируется отдельно и инвалидируется вместе с кэшем паллет.

use super::aggregate::Pallet;
use super::lifecycle::PalletStatus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Итоги по одному типу классификации
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeTotals {
    pub classification_type: String,
    pub boxes: i64,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PalletSummary {
    pub total_pallets: usize,
    pub partial_pallets: usize,
    pub complete_pallets: usize,
    pub total_boxes: i64,
    pub total_weight: f64,
    /// Отсортировано по типу классификации
    pub by_type: Vec<TypeTotals>,
}

/// Посчитать сводку; удалённые паллеты не учитываются
pub fn summarize(pallets: &[Pallet]) -> PalletSummary {
    let mut summary = PalletSummary::default();
    let mut by_type: BTreeMap<&str, (i64, f64)> = BTreeMap::new();

    for pallet in pallets.iter().filter(|p| p.base.is_active()) {
        summary.total_pallets += 1;
        match pallet.status {
            PalletStatus::Partial => summary.partial_pallets += 1,
            PalletStatus::Complete => summary.complete_pallets += 1,
        }
        for line in &pallet.classifications {
            summary.total_boxes = summary.total_boxes.saturating_add(line.quantity);
            summary.total_weight += line.weight;
            let entry = by_type.entry(&line.classification_type).or_insert((0, 0.0));
            entry.0 = entry.0.saturating_add(line.quantity);
            entry.1 += line.weight;
        }
    }

    summary.by_type = by_type
        .into_iter()
        .map(|(classification_type, (boxes, weight))| TypeTotals {
            classification_type: classification_type.to_string(),
            boxes,
            weight,
        })
        .collect();
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::a002_pallet::aggregate::{AddQuantityRequest, PalletCreateDto};

    fn pallet(code: &str, lines: &[(&str, i64)]) -> Pallet {
        let mut p = Pallet::new(PalletCreateDto {
            id: None,
            code: code.into(),
            description: String::new(),
            customer_order_id: None,
        });
        for (t, q) in lines {
            p.add_quantity(&AddQuantityRequest {
                order_id: "ord-1".into(),
                classification_type: t.to_string(),
                product_id: "mango".into(),
                quantity: *q,
                weight: *q as f64,
                lot: None,
            })
            .unwrap();
        }
        p
    }

    #[test]
    fn test_summary_groups_by_type() {
        let mut closed = pallet("P-002", &[("primera", 40)]);
        closed.status = PalletStatus::Complete;
        let pallets = vec![pallet("P-001", &[("extra", 30), ("primera", 10)]), closed];

        let s = summarize(&pallets);
        assert_eq!(s.total_pallets, 2);
        assert_eq!(s.partial_pallets, 1);
        assert_eq!(s.complete_pallets, 1);
        assert_eq!(s.total_boxes, 80);
        assert_eq!(s.by_type.len(), 2);
        assert_eq!(s.by_type[0].classification_type, "extra");
        assert_eq!(s.by_type[1].boxes, 50);
    }

    #[test]
    fn test_deleted_pallets_are_skipped() {
        let mut gone = pallet("P-003", &[("extra", 5)]);
        gone.base.metadata.is_deleted = true;
        let s = summarize(&[gone]);
        assert_eq!(s, PalletSummary::default());
    }
}
