use super::aggregate::CustomerOrder;
use crate::domain::a002_pallet::Pallet;
use serde::{Deserialize, Serialize};

/// Доступность по строке заказа клиента: сколько ещё коробок нужно
///
/// Снимок на момент открытия диалога; не кэшируется дольше жизни диалога,
/// потому что два оператора могут заполнять один и тот же остаток.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerOrderAvailability {
    pub customer_order_id: String,
    pub classification_type: String,
    pub product_id: String,
    pub required_quantity: i64,
    pub assigned_quantity: i64,
}

/// Query параметры запроса доступности
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityQuery {
    pub classification_type: String,
    pub product_id: String,
}

impl CustomerOrderAvailability {
    /// Остаток коробок; перевыполненный заказ даёт 0, а не отрицательное число
    pub fn remaining(&self) -> i64 {
        self.required_quantity
            .saturating_sub(self.assigned_quantity)
            .max(0)
    }
}

/// Посчитать доступность по строке заказа и уже собранным паллетам
///
/// `None`, если в заказе нет строки для пары тип/продукт.
pub fn compute_availability(
    order: &CustomerOrder,
    classification_type: &str,
    product_id: &str,
    pallets: &[Pallet],
) -> Option<CustomerOrderAvailability> {
    let line = order.line_for(classification_type, product_id)?;
    let order_id = order.to_string_id();

    let assigned_quantity = pallets
        .iter()
        .filter(|p| p.base.is_active())
        .filter(|p| p.customer_order_id.as_deref() == Some(order_id.as_str()))
        .flat_map(|p| p.classifications.iter())
        .filter(|c| c.classification_type == classification_type && c.product_id == product_id)
        .fold(0i64, |acc, c| acc.saturating_add(c.quantity));

    Some(CustomerOrderAvailability {
        customer_order_id: order_id,
        classification_type: classification_type.to_string(),
        product_id: product_id.to_string(),
        required_quantity: line.required_quantity,
        assigned_quantity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::a002_pallet::{AddQuantityRequest, PalletCreateDto};
    use crate::domain::a003_customer_order::aggregate::{CustomerOrderCreateDto, CustomerOrderLine};

    fn order() -> CustomerOrder {
        CustomerOrder::new(CustomerOrderCreateDto {
            code: "CO-42".into(),
            description: String::new(),
            customer: "Mercado Central".into(),
            lines: vec![CustomerOrderLine {
                classification_type: "extra".into(),
                product_id: "mango".into(),
                required_quantity: 50,
            }],
        })
    }

    fn pallet_for(order_id: Option<String>, quantity: i64) -> Pallet {
        let mut p = Pallet::new(PalletCreateDto {
            id: None,
            code: "P-010".into(),
            description: String::new(),
            customer_order_id: order_id,
        });
        p.add_quantity(&AddQuantityRequest {
            order_id: "ord-1".into(),
            classification_type: "extra".into(),
            product_id: "mango".into(),
            quantity,
            weight: 0.0,
            lot: None,
        })
        .unwrap();
        p
    }

    #[test]
    fn test_assigned_counts_only_linked_pallets() {
        let o = order();
        let pallets = vec![
            pallet_for(Some(o.to_string_id()), 20),
            pallet_for(Some(o.to_string_id()), 15),
            pallet_for(None, 100),
        ];
        let a = compute_availability(&o, "extra", "mango", &pallets).unwrap();
        assert_eq!(a.assigned_quantity, 35);
        assert_eq!(a.remaining(), 15);
    }

    #[test]
    fn test_missing_line_yields_none() {
        assert!(compute_availability(&order(), "primera", "mango", &[]).is_none());
    }

    #[test]
    fn test_overfilled_order_has_zero_remaining() {
        let o = order();
        let pallets = vec![pallet_for(Some(o.to_string_id()), 60)];
        let a = compute_availability(&o, "extra", "mango", &pallets).unwrap();
        assert_eq!(a.remaining(), 0);
    }
}
