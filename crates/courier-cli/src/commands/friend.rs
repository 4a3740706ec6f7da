use std::path::Path;

use crate::cli::FriendCommands;
use crate::commands::common::{normalize_user_id, open_database};
use crate::error::CliError;

pub async fn run_friend(command: FriendCommands, db_path: &Path) -> Result<(), CliError> {
    match command {
        FriendCommands::Add { user, friend } => run_friend_add(&user, &friend, db_path).await,
        FriendCommands::List { user, limit, json } => {
            run_friend_list(&user, limit, json, db_path).await
        }
    }
}

pub async fn run_friend_add(user: &str, friend: &str, db_path: &Path) -> Result<(), CliError> {
    let user = normalize_user_id(user)?;
    let friend = normalize_user_id(friend)?;
    let db = open_database(db_path).await?;
    db.add_friend(&user, &friend).await?;
    println!("{user} and {friend} are now friends");
    Ok(())
}

pub async fn run_friend_list(
    user: &str,
    limit: usize,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let user = normalize_user_id(user)?;
    let db = open_database(db_path).await?;
    let friends = db.list_friends(&user, limit).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&friends)?);
    } else if friends.is_empty() {
        println!("No friends yet.");
    } else {
        for friend in friends {
            println!("{friend}");
        }
    }
    Ok(())
}
