// Copyright PingCAP Inc. 2025.
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; version 2 of the License.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

use clap::Parser;
use estado::actor::{FileLockStore, InMemoryLockStore, LockActorPool, LockRecordStore};
use estado::auth::file_auth::FileAuthenticator;
use estado::auth::{AnonymousAuthenticator, Authenticator, BasicAuthenticator};
use estado::config::{AuthMode, BackendKind, Config};
use estado::handler::BaseHandler;
use estado::http::StateHttpHandler;
use estado::observability::tracing_setup;
use estado::server::{ConnectionManager, HttpConnectionManager, OpsConnectionManager};
use estado::service::StateService;
use estado::storage::file_storage::FileBlobStore;
use estado::storage::in_memory::InMemoryBlobStore;
use estado::storage::BlobStore;
use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "estado")]
#[command(about = "Remote state backend with per-project locking", long_about = None)]
struct Args {
    /// Address to listen on (e.g., 0.0.0.0:8080, 127.0.0.1:8080)
    #[arg(short, long)]
    listen: Option<String>,

    /// Path to configuration file
    #[arg(short, long, default_value = "estado.toml")]
    config: String,

    /// Path to credentials file; implies file authentication
    #[arg(short, long)]
    auth_file: Option<String>,
}

async fn build_authenticator(
    cfg: &Config,
    auth_file: Option<&str>,
) -> Result<Arc<dyn Authenticator>, Box<dyn std::error::Error>> {
    if let Some(path) = auth_file {
        return Ok(Arc::new(FileAuthenticator::new(path).await?));
    }
    let auth: Arc<dyn Authenticator> = match cfg.auth.mode {
        AuthMode::Basic => Arc::new(BasicAuthenticator),
        AuthMode::File => {
            let path = cfg
                .auth
                .credentials_file
                .as_deref()
                .ok_or("auth.credentials_file is not set")?;
            Arc::new(FileAuthenticator::new(path).await?)
        }
        AuthMode::None => {
            tracing::warn!(
                identity = %cfg.auth.anonymous_identity,
                "authentication disabled, all requests share one identity"
            );
            Arc::new(AnonymousAuthenticator::new(cfg.auth.anonymous_identity.clone()))
        }
    };
    Ok(auth)
}

async fn build_service(cfg: &Config) -> Result<StateService, Box<dyn std::error::Error>> {
    let blobs: Arc<dyn BlobStore> = match cfg.storage.backend {
        BackendKind::File => Arc::new(FileBlobStore::new(&cfg.storage.path).await?),
        BackendKind::InMemory => Arc::new(InMemoryBlobStore::new()),
    };
    let lock_store: Arc<dyn LockRecordStore> = match cfg.locks.backend {
        BackendKind::File => Arc::new(FileLockStore::new(&cfg.locks.path).await?),
        BackendKind::InMemory => Arc::new(InMemoryLockStore::new()),
    };
    tracing::info!(
        storage = blobs.backend_name(),
        locks = lock_store.backend_name(),
        mailbox_capacity = cfg.locks.mailbox_capacity,
        "backends ready"
    );

    let locks = LockActorPool::with_capacity(lock_store, cfg.locks.mailbox_capacity);
    Ok(StateService::new(blobs, locks))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = tracing_setup::init_tracing_from_env() {
        eprintln!("failed to initialize tracing: {e}");
    }

    let args = Args::parse();

    let cfg = Config::from_path(&args.config)?;

    // Command line args override config file
    let addr: SocketAddr = args.listen.as_ref().unwrap_or(&cfg.listen_addr).parse()?;

    let auth = build_authenticator(&cfg, args.auth_file.as_deref()).await?;
    let service = build_service(&cfg).await?;

    let handler = BaseHandler::new(auth, service).with_realm(cfg.auth.realm.clone());
    let http = StateHttpHandler::new(handler).with_body_limit(cfg.max_body_bytes);

    if let Some(ops_addr) = cfg.ops_listen_addr.as_deref() {
        let ops_addr: SocketAddr = ops_addr.parse()?;
        let ops = OpsConnectionManager::new(http.clone());
        tokio::spawn(async move {
            if let Err(e) = ops.serve(ops_addr).await {
                tracing::error!("ops server exited with error: {e}");
            }
        });
    }

    let server = HttpConnectionManager::new(http);
    tracing::info!("estado listening on {}", addr);

    tokio::select! {
        r = server.serve(addr) => {
            if let Err(e) = r {
                tracing::error!("server exited with error: {e}");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("ctrl-c received, shutting down");
        }
    }

    Ok(())
}
