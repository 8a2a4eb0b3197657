use crate::doc;
use crate::types::Document;

/// The sample `sales` collection: three fruits and two vegetables.
pub fn sales() -> Vec<Document> {
    vec![
        doc! { "_id" => 1, "item" => "Apple", "price" => 10, "quantity" => 5, "category" => "Fruit" },
        doc! { "_id" => 2, "item" => "Banana", "price" => 5, "quantity" => 10, "category" => "Fruit" },
        doc! { "_id" => 3, "item" => "Carrot", "price" => 8, "quantity" => 6, "category" => "Vegetable" },
        doc! { "_id" => 4, "item" => "Tomato", "price" => 6, "quantity" => 8, "category" => "Vegetable" },
        doc! { "_id" => 5, "item" => "Mango", "price" => 15, "quantity" => 3, "category" => "Fruit" },
    ]
}
