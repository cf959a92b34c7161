use tracker_core::{Identity, LocalIdentityProvider};

use crate::error::CliError;
use crate::identity_store::{clear_identity, load_identity, save_identity, DataPaths};
use crate::session::{open_session_as, sign_out};

pub fn resolve_login_identity(uid: Option<String>, anonymous: bool) -> Result<Identity, CliError> {
    if anonymous {
        return Ok(LocalIdentityProvider::default().sign_in_anonymously());
    }
    let uid = uid.ok_or_else(|| CliError::Config("An account id is required".to_string()))?;
    Ok(Identity::new(uid)?)
}

pub async fn run_login(
    uid: Option<String>,
    anonymous: bool,
    paths: &DataPaths,
) -> Result<(), CliError> {
    let identity = resolve_login_identity(uid, anonymous)?;
    let identity_file = paths.identity_file();

    if let Some(previous) = load_identity(&identity_file)? {
        if previous != identity {
            sign_out(paths, previous).await?;
        }
    }
    save_identity(&identity_file, &identity)?;

    let label = if identity.is_anonymous {
        format!("guest {}", identity.uid)
    } else {
        identity.uid.clone()
    };
    let session = open_session_as(paths, identity).await?;
    let count = session.handle.records().len();
    let status = session.close().await?;

    println!("Signed in as {label} ({count} tests, {status})");
    Ok(())
}

pub async fn run_logout(paths: &DataPaths) -> Result<(), CliError> {
    let identity_file = paths.identity_file();
    let Some(identity) = load_identity(&identity_file)? else {
        println!("Not signed in");
        return Ok(());
    };

    let uid = identity.uid.clone();
    sign_out(paths, identity).await?;
    clear_identity(&identity_file)?;

    println!("Signed out {uid}");
    Ok(())
}
