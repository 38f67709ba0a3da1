//! Command handlers for the BitChat trust CLI

use tracing::{info, warn};

use bitchat_security::{
    storage::SecureStorage, ChannelKeyPacket, Fingerprint, IdentityHint, PeerId, SocialIdentity,
    Timestamp,
};

use crate::app::TrustApp;
use crate::cli::{ChannelCommand, Commands, IdentityCommand};
use crate::error::{CliError, Result};

/// Command dispatcher for handling CLI commands
pub struct CommandDispatcher;

impl CommandDispatcher {
    /// Execute a CLI command
    pub async fn execute(command: Commands, app: &TrustApp) -> Result<()> {
        match command {
            Commands::Identities { action } => Self::handle_identity_command(app, action).await,
            Commands::Channel { action } => Self::handle_channel_command(app, action).await,
            Commands::Panic { yes } => Self::handle_panic_command(app, yes).await,
            Commands::Config => {
                print!("{}", app.config().to_toml()?);
                Ok(())
            }
        }
    }

    // ------------------------------------------------------------------------
    // Identities
    // ------------------------------------------------------------------------

    async fn handle_identity_command(app: &TrustApp, action: IdentityCommand) -> Result<()> {
        let identities = app.identities();
        match action {
            IdentityCommand::List => {
                let all = identities.get_all_social_identities().await;
                if all.is_empty() {
                    println!("No known identities");
                    return Ok(());
                }
                let verified = identities.get_verified_fingerprints().await;
                for social in &all {
                    println!("{}", format_identity(social, verified.contains(&social.fingerprint)));
                }
                let stats = identities.cache_stats().await;
                println!(
                    "\n{} identities, {} verified, {} favorites, {} blocked",
                    stats.total_social_identities,
                    stats.total_verified,
                    stats.total_favorites,
                    stats.total_blocked
                );
            }
            IdentityCommand::Resolve { nickname } => {
                // Offline lookups have no transport peer; any id will do
                let hint = identities
                    .resolve_identity(&PeerId::new([0u8; 8]), &nickname)
                    .await;
                match hint {
                    IdentityHint::Unknown => println!("{nickname}: unknown"),
                    IdentityHint::LikelyKnown(fingerprint) => {
                        println!("{nickname}: likely {fingerprint}")
                    }
                    IdentityHint::Ambiguous(candidates) => {
                        println!("{nickname}: ambiguous ({} candidates)", candidates.len());
                        for fingerprint in candidates {
                            println!("  {fingerprint}");
                        }
                    }
                }
            }
            IdentityCommand::Favorite { fingerprint, off } => {
                let fingerprint = parse_fingerprint(&fingerprint)?;
                identities.set_favorite(&fingerprint, !off).await?;
                println!("{} favorite: {}", fingerprint.short(), !off);
            }
            IdentityCommand::Block { fingerprint, off } => {
                let fingerprint = parse_fingerprint(&fingerprint)?;
                identities.set_blocked(&fingerprint, !off).await?;
                println!("{} blocked: {}", fingerprint.short(), !off);
            }
            IdentityCommand::Verify { fingerprint, off } => {
                let fingerprint = parse_fingerprint(&fingerprint)?;
                identities.set_verified(&fingerprint, !off).await?;
                println!("{} verified: {}", fingerprint.short(), !off);
            }
            IdentityCommand::Petname { fingerprint, name } => {
                let fingerprint = parse_fingerprint(&fingerprint)?;
                identities.set_petname(&fingerprint, name.clone()).await?;
                match name {
                    Some(name) => println!("{} is now {name}", fingerprint.short()),
                    None => println!("Petname cleared for {}", fingerprint.short()),
                }
            }
            IdentityCommand::Forget { fingerprint } => {
                let fingerprint = parse_fingerprint(&fingerprint)?;
                match identities.remove_social_identity(&fingerprint).await? {
                    Some(_) => println!("Forgot {}", fingerprint.short()),
                    None => println!("{} was not known", fingerprint.short()),
                }
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Channels
    // ------------------------------------------------------------------------

    async fn handle_channel_command(app: &TrustApp, action: ChannelCommand) -> Result<()> {
        let channels = app.channels();
        match action {
            ChannelCommand::SetPassword {
                channel,
                password,
                creator,
            } => {
                let creator = creator.as_deref().map(parse_fingerprint).transpose()?;
                info!(%channel, "Deriving channel key");
                channels
                    .set_channel_password(&password, &channel, creator.as_ref())
                    .await?;
                println!("Password set for {channel}");
            }
            ChannelCommand::Encrypt { channel, text } => {
                let sealed = channels.encrypt_channel_message(&text, &channel).await?;
                println!("{}", hex::encode(sealed));
            }
            ChannelCommand::Decrypt { channel, hex } => {
                let data = hex::decode(hex.trim())?;
                println!("{}", channels.decrypt_channel_message(&data, &channel).await?);
            }
            ChannelCommand::Forget { channel } => {
                channels.remove_channel_password(&channel).await?;
                println!("Removed password for {channel}");
            }
            ChannelCommand::List => {
                let mut stored = channels.stored_channels()?;
                stored.sort();
                if stored.is_empty() {
                    println!("No channel passwords stored");
                }
                for channel in stored {
                    println!("{channel}");
                }
            }
            ChannelCommand::Share { channel } => match channels.share_stored_password(&channel)? {
                Some(packet) => println!("{}", String::from_utf8_lossy(&packet)),
                None => {
                    return Err(CliError::InvalidArgument(format!(
                        "No password stored for {channel}"
                    )))
                }
            },
            ChannelCommand::Accept { packet } => {
                let received = ChannelKeyPacket::decode(packet.as_bytes()).map_err(|_| {
                    CliError::InvalidArgument("Key packet is malformed".to_string())
                })?;

                let ledger = app.replay_ledger();
                ledger.prune(Timestamp::now())?;
                if ledger.contains(&received.nonce)? {
                    warn!(channel = %received.channel, "Key packet was accepted by an earlier run");
                    return Err(CliError::InvalidArgument(
                        "Key packet was already accepted".to_string(),
                    ));
                }

                let Some((channel, password)) =
                    channels.process_channel_key_packet(packet.as_bytes()).await
                else {
                    warn!("Key packet rejected");
                    return Err(CliError::InvalidArgument(
                        "Key packet is stale or replayed".to_string(),
                    ));
                };
                channels.set_channel_password(&password, &channel, None).await?;
                ledger.record(&received)?;
                println!("Joined {channel}");
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Panic
    // ------------------------------------------------------------------------

    async fn handle_panic_command(app: &TrustApp, confirmed: bool) -> Result<()> {
        if !confirmed {
            return Err(CliError::InvalidArgument(
                "panic erases all trust data; re-run with --yes".to_string(),
            ));
        }

        app.identities().clear_all_identity_data().await?;
        for channel in app.channels().stored_channels()? {
            app.channels().remove_channel_password(&channel).await?;
        }
        app.storage().clear_all()?;
        println!("All identity data and channel passwords erased");
        Ok(())
    }
}

fn parse_fingerprint(value: &str) -> Result<Fingerprint> {
    Ok(value.parse::<Fingerprint>()?)
}

fn format_identity(social: &SocialIdentity, verified: bool) -> String {
    let mut flags = Vec::new();
    if social.is_favorite {
        flags.push("favorite");
    }
    if social.is_blocked {
        flags.push("blocked");
    }
    if verified {
        flags.push("verified");
    }
    format!(
        "{}  {:<20} {:?}{}{}",
        social.fingerprint,
        social.display_name(),
        social.trust_level,
        if flags.is_empty() { "" } else { "  " },
        flags.join(",")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitchat_security::TrustLevel;

    #[test]
    fn test_format_identity() {
        let mut social = SocialIdentity::with_nickname(Fingerprint::new([1u8; 32]), "alice");
        social.set_favorite(true);
        social.trust_level = TrustLevel::Casual;
        let line = format_identity(&social, false);
        assert!(line.starts_with(&"01".repeat(32)));
        assert!(line.contains("alice"));
        assert!(line.ends_with("Casual  favorite"));
    }

    #[test]
    fn test_parse_fingerprint_rejects_short_input() {
        assert!(parse_fingerprint("abcd").is_err());
        assert!(parse_fingerprint(&"ab".repeat(32)).is_ok());
    }
}
