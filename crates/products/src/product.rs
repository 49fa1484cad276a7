use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use storefront_core::{Aggregate, AggregateId, AggregateRoot, DomainError, DomainEvent, UserId};

/// Lowest accepted review rating (stars).
pub const MIN_RATING: u8 = 1;
/// Highest accepted review rating (stars).
pub const MAX_RATING: u8 = 5;

/// Product identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub AggregateId);

impl ProductId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Customer review attached to a product. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub user: UserId,
    /// Reviewer display name at the time of the review.
    pub name: String,
    pub rating: u8,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// Merchandising attributes of a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetails {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub images: Vec<String>,
    pub brand: String,
    pub category: String,
    pub count_in_stock: i64,
    pub featured: bool,
}

impl Default for ProductDetails {
    /// Placeholder values used when an admin creates a product without filling
    /// in every field.
    fn default() -> Self {
        Self {
            name: "Sample name".to_string(),
            description: "Sample description".to_string(),
            price: Decimal::ZERO,
            images: Vec::new(),
            brand: "Sample brand".to_string(),
            category: "Sample category".to_string(),
            count_in_stock: 0,
            featured: false,
        }
    }
}

/// Aggregate root: Product (catalog entry + reviews).
///
/// # Invariants
/// - `rating` is the arithmetic mean of all review ratings (0 with no reviews).
/// - `num_reviews == reviews.len()`.
/// - At most one review per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    id: ProductId,
    #[serde(rename = "user")]
    created_by: Option<UserId>,
    #[serde(flatten)]
    details: ProductDetails,
    rating: f64,
    num_reviews: u32,
    reviews: Vec<Review>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(rename = "__v")]
    version: u64,
}

impl Product {
    /// Create an empty, not-yet-created aggregate instance.
    pub fn empty(id: ProductId) -> Self {
        Self {
            id,
            created_by: None,
            details: ProductDetails::default(),
            rating: 0.0,
            num_reviews: 0,
            reviews: Vec::new(),
            created_at: DateTime::<Utc>::default(),
            updated_at: DateTime::<Utc>::default(),
            version: 0,
        }
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn details(&self) -> &ProductDetails {
        &self.details
    }

    pub fn name(&self) -> &str {
        &self.details.name
    }

    pub fn price(&self) -> Decimal {
        self.details.price
    }

    pub fn is_featured(&self) -> bool {
        self.details.featured
    }

    pub fn rating(&self) -> f64 {
        self.rating
    }

    pub fn num_reviews(&self) -> u32 {
        self.num_reviews
    }

    pub fn reviews(&self) -> &[Review] {
        &self.reviews
    }

    pub fn has_review_from(&self, user: UserId) -> bool {
        self.reviews.iter().any(|r| r.user == user)
    }

    pub fn is_created(&self) -> bool {
        self.version > 0
    }

    fn recompute_rating(&mut self) {
        self.num_reviews = self.reviews.len() as u32;
        self.rating = if self.reviews.is_empty() {
            0.0
        } else {
            let sum: u32 = self.reviews.iter().map(|r| u32::from(r.rating)).sum();
            f64::from(sum) / f64::from(self.num_reviews)
        };
    }
}

impl AggregateRoot for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateProduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProduct {
    pub product_id: ProductId,
    pub created_by: UserId,
    pub details: ProductDetails,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddReview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddReview {
    pub product_id: ProductId,
    pub review_id: Uuid,
    pub user: UserId,
    pub user_name: String,
    /// Raw rating as submitted; validated against `MIN_RATING..=MAX_RATING`.
    pub rating: i64,
    pub comment: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductCommand {
    CreateProduct(CreateProduct),
    AddReview(AddReview),
}

/// Event: ProductCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCreated {
    pub product_id: ProductId,
    pub created_by: UserId,
    pub details: ProductDetails,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReviewAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewAdded {
    pub product_id: ProductId,
    pub review: Review,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductEvent {
    ProductCreated(ProductCreated),
    ReviewAdded(ReviewAdded),
}

impl DomainEvent for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::ProductCreated(_) => "products.product.created",
            ProductEvent::ReviewAdded(_) => "products.product.review_added",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ProductEvent::ProductCreated(e) => e.occurred_at,
            ProductEvent::ReviewAdded(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Product {
    type Command = ProductCommand;
    type Event = ProductEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ProductEvent::ProductCreated(e) => {
                self.id = e.product_id;
                self.created_by = Some(e.created_by);
                self.details = e.details.clone();
                self.rating = 0.0;
                self.num_reviews = 0;
                self.reviews.clear();
                self.created_at = e.occurred_at;
                self.updated_at = e.occurred_at;
            }
            ProductEvent::ReviewAdded(e) => {
                self.reviews.push(e.review.clone());
                self.recompute_rating();
                self.updated_at = e.occurred_at;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ProductCommand::CreateProduct(cmd) => self.handle_create(cmd),
            ProductCommand::AddReview(cmd) => self.handle_add_review(cmd),
        }
    }
}

impl Product {
    fn ensure_product_id(&self, product_id: ProductId) -> Result<(), DomainError> {
        if self.id != product_id {
            return Err(DomainError::invariant("product_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        if self.is_created() {
            return Err(DomainError::conflict("product already exists"));
        }

        let details = &cmd.details;
        if details.name.trim().is_empty() {
            return Err(DomainError::validation("Product name cannot be empty"));
        }
        if details.price < Decimal::ZERO {
            return Err(DomainError::validation("Price cannot be negative"));
        }
        if details.count_in_stock < 0 {
            return Err(DomainError::validation("Count in stock cannot be negative"));
        }

        Ok(vec![ProductEvent::ProductCreated(ProductCreated {
            product_id: cmd.product_id,
            created_by: cmd.created_by,
            details: details.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_review(&self, cmd: &AddReview) -> Result<Vec<ProductEvent>, DomainError> {
        if !self.is_created() {
            return Err(DomainError::not_found());
        }
        self.ensure_product_id(cmd.product_id)?;

        if self.has_review_from(cmd.user) {
            return Err(DomainError::invariant("Product already reviewed"));
        }

        let rating = u8::try_from(cmd.rating)
            .ok()
            .filter(|r| (MIN_RATING..=MAX_RATING).contains(r))
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "Rating must be between {MIN_RATING} and {MAX_RATING}"
                ))
            })?;

        Ok(vec![ProductEvent::ReviewAdded(ReviewAdded {
            product_id: cmd.product_id,
            review: Review {
                id: cmd.review_id,
                user: cmd.user,
                name: cmd.user_name.clone(),
                rating,
                comment: cmd.comment.clone(),
                created_at: cmd.occurred_at,
            },
            occurred_at: cmd.occurred_at,
        })])
    }
}
