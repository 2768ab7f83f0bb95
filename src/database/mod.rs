use mongodb::{Client, Collection, Database};
use std::error::Error;

#[derive(Clone)]
pub struct MongoDB {
    client: Client,
    db: Database,
}

impl MongoDB {
    pub async fn new(uri: &str) -> Result<Self, Box<dyn Error>> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri).await?;

        // Connection pool otimizado
        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(5);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));

        // Timeouts otimizados
        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        let client = Client::with_options(client_options)?;

        // Extract database name from URI or use default
        let db_name = uri
            .split('/')
            .last()
            .and_then(|s| s.split('?').next())
            .unwrap_or("ColetaSeletiva");

        let db = client.database(db_name);

        // Test connection
        db.list_collection_names().await?;

        let mongodb = Self { client, db };

        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Creates necessary indexes for optimal query performance.
    /// Unicidade de email e de nome de material é garantida aqui, no banco.
    async fn ensure_indexes(&self) -> Result<(), Box<dyn Error>> {
        use mongodb::bson::doc;
        use mongodb::options::IndexOptions;
        use mongodb::IndexModel;

        log::info!("🔧 Creating database indexes...");

        let unique = IndexOptions::builder().unique(true).build();

        let users = self.database().collection::<mongodb::bson::Document>("users");
        match users
            .create_indexes(vec![
                IndexModel::builder()
                    .keys(doc! { "email": 1 })
                    .options(unique.clone())
                    .build(),
                IndexModel::builder().keys(doc! { "user_id": 1 }).build(),
            ])
            .await
        {
            Ok(_) => log::info!("   ✅ Indexes created: users(email unique, user_id)"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        let materials = self.database().collection::<mongodb::bson::Document>("materials");
        match materials
            .create_indexes(vec![
                IndexModel::builder()
                    .keys(doc! { "name": 1 })
                    .options(unique)
                    .build(),
                IndexModel::builder().keys(doc! { "material_id": 1 }).build(),
            ])
            .await
        {
            Ok(_) => log::info!("   ✅ Indexes created: materials(name unique, material_id)"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        let collections = self.database().collection::<mongodb::bson::Document>("collections");
        match collections
            .create_indexes(vec![
                IndexModel::builder().keys(doc! { "collection_id": 1 }).build(),
                IndexModel::builder().keys(doc! { "requester_id": 1 }).build(),
                IndexModel::builder()
                    .keys(doc! { "cooperative_id": 1, "status": 1 })
                    .build(),
            ])
            .await
        {
            Ok(_) => log::info!(
                "   ✅ Indexes created: collections(collection_id, requester_id, cooperative_id+status)"
            ),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        let line_items = self
            .database()
            .collection::<mongodb::bson::Document>("collection_materials");
        match line_items
            .create_indexes(vec![IndexModel::builder()
                .keys(doc! { "collection_id": 1 })
                .build()])
            .await
        {
            Ok(_) => log::info!("   ✅ Index created: collection_materials(collection_id)"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        log::info!("✅ Database indexes ready");

        Ok(())
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}
