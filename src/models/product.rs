use serde::{Deserialize, Serialize};

use super::{check_length, FieldErrors};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub stock: i64,
    pub user_id: i64,
    pub created_at: chrono::NaiveDateTime,
}

/// Body of `POST /products` and `PUT /products/{id}`; every field is optional
/// here so updates can be partial.
#[derive(Debug, Default, Deserialize)]
pub struct ProductPayload {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<i64>,
}

#[derive(Debug)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub stock: i64,
}

impl ProductPayload {
    pub fn validate_new(self) -> Result<NewProduct, FieldErrors> {
        let mut errors = FieldErrors::default();
        if self.name.is_none() {
            errors.add("name", "Missing data for required field.");
        }
        if self.price.is_none() {
            errors.add("price", "Missing data for required field.");
        }
        let checked = self.validate_update();

        match (checked, errors.is_empty()) {
            (Ok(payload), true) => Ok(NewProduct {
                name: payload.name.unwrap_or_default(),
                description: payload.description,
                price: payload.price.unwrap_or_default(),
                stock: payload.stock.unwrap_or(0),
            }),
            (Ok(_), false) => Err(errors),
            (Err(field_errors), _) => {
                for (field, messages) in field_errors.0 {
                    for message in messages {
                        errors.add(field, message);
                    }
                }
                Err(errors)
            }
        }
    }

    pub fn validate_update(self) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::default();

        if let Some(name) = &self.name {
            check_length(&mut errors, "name", name, 1, Some(100));
        }
        if let Some(price) = self.price {
            if !price.is_finite() || price < 0.0 {
                errors.add("price", "Must be greater than or equal to 0.");
            }
        }
        if let Some(stock) = self.stock {
            if stock < 0 {
                errors.add("stock", "Must be greater than or equal to 0.");
            }
        }

        errors.finish(self)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProducts {
    pub user: String,
    pub products: Vec<Product>,
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_product_requires_name_and_price() {
        let errors = ProductPayload::default().validate_new().unwrap_err();
        assert!(errors.get("name").is_some());
        assert!(errors.get("price").is_some());
    }

    #[test]
    fn stock_defaults_to_zero() {
        let product = ProductPayload {
            name: Some("Laptop".into()),
            price: Some(899.99),
            ..Default::default()
        }
        .validate_new()
        .unwrap();
        assert_eq!(product.stock, 0);
    }

    #[test]
    fn rejects_negative_values_on_update() {
        let errors = ProductPayload {
            price: Some(-1.0),
            stock: Some(-3),
            ..Default::default()
        }
        .validate_update()
        .unwrap_err();
        assert!(errors.get("price").is_some());
        assert!(errors.get("stock").is_some());
    }

    #[test]
    fn empty_name_is_rejected() {
        let errors = ProductPayload {
            name: Some(String::new()),
            price: Some(1.0),
            ..Default::default()
        }
        .validate_new()
        .unwrap_err();
        assert_eq!(errors.get("name").unwrap().len(), 1);
    }
}
