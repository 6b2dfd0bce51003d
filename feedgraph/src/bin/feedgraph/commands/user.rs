use anyhow::Result;
use clap::Subcommand;

use feedgraph::{BlockOutcome, FollowOutcome, GraphStore, NewUser, ProfilePatch, Role};

use crate::context::Session;
use crate::examples::ExampleGroup;
use crate::output::OutputManager;

pub const EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Accounts",
        commands: &[
            "feedgraph user register alice --bio 'hello'      # Create a public account",
            "feedgraph user register bob --private             # Create a private account",
            "feedgraph --as <id> user update <id> --bio 'new'  # Patch your own profile",
            "feedgraph --as <id> user delete <id>              # Delete an account and its content",
        ],
    },
    ExampleGroup {
        title: "Relationships",
        commands: &[
            "feedgraph --as <id> user requests                 # Pending follow requests",
            "feedgraph --as <id> user approve <requester-id>   # Accept a follow request",
            "feedgraph user followers <id>                     # List followers",
        ],
    },
];

#[derive(Subcommand)]
pub enum UserCommands {
    /// Register a new user
    #[command(name = "register")]
    Register {
        username: String,

        #[arg(long)]
        bio: Option<String>,

        /// Only approved followers can see posts
        #[arg(long)]
        private: bool,

        /// Give the account the admin role
        #[arg(long)]
        admin_role: bool,
    },

    /// Show a profile with relation counts
    #[command(name = "show")]
    Show { user_id: String },

    /// Patch your own profile
    #[command(name = "update")]
    Update {
        user_id: String,

        #[arg(long)]
        username: Option<String>,

        #[arg(long)]
        bio: Option<String>,

        #[arg(long)]
        private: Option<bool>,
    },

    /// Delete an account with its posts and comments (self or admin)
    #[command(name = "delete")]
    Delete { user_id: String },

    /// List followers of a user
    #[command(name = "followers")]
    Followers { user_id: String },

    /// List users a user follows
    #[command(name = "followings")]
    Followings { user_id: String },

    /// List pending follow requests addressed to you
    #[command(name = "requests")]
    Requests,

    /// Approve a pending follow request
    #[command(name = "approve")]
    Approve { requester_id: String },

    /// Reject a pending follow request
    #[command(name = "reject")]
    Reject { requester_id: String },

    /// List users you blocked
    #[command(name = "blocked")]
    Blocked,
}

pub async fn handle_user_commands<S: GraphStore>(
    command: UserCommands,
    session: &Session<S>,
    output: &OutputManager,
) -> Result<()> {
    let graph = &session.graph;
    match command {
        UserCommands::Register {
            username,
            bio,
            private,
            admin_role,
        } => {
            let user = graph
                .register_user(NewUser {
                    username,
                    bio,
                    is_private: private,
                    role: if admin_role { Role::Admin } else { Role::User },
                })
                .await?;
            output.success(&format!("Registered {}", user.username));
            output.display(&user)?;
        }
        UserCommands::Show { user_id } => {
            output.display(&graph.profile(&user_id).await?)?;
        }
        UserCommands::Update {
            user_id,
            username,
            bio,
            private,
        } => {
            let patch = ProfilePatch {
                username,
                bio,
                is_private: private,
            };
            let user = graph.update_profile(session.principal()?, &user_id, patch).await?;
            output.success("Profile updated");
            output.display(&user)?;
        }
        UserCommands::Delete { user_id } => {
            graph.delete_user(session.principal()?, &user_id).await?;
            output.success(&format!("Deleted user {user_id}"));
        }
        UserCommands::Followers { user_id } => {
            output.rows(graph.followers(&user_id).await?)?;
        }
        UserCommands::Followings { user_id } => {
            output.rows(graph.followings(&user_id).await?)?;
        }
        UserCommands::Requests => {
            output.rows(graph.pending_follow_requests(session.principal()?).await?)?;
        }
        UserCommands::Approve { requester_id } => {
            graph.approve_follow_request(session.principal()?, &requester_id).await?;
            output.success(&format!("Approved follow request from {requester_id}"));
        }
        UserCommands::Reject { requester_id } => {
            graph.reject_follow_request(session.principal()?, &requester_id).await?;
            output.success(&format!("Rejected follow request from {requester_id}"));
        }
        UserCommands::Blocked => {
            output.rows(graph.blocked_users(session.principal()?).await?)?;
        }
    }
    Ok(())
}

pub async fn handle_follow<S: GraphStore>(target_id: &str, session: &Session<S>, output: &OutputManager) -> Result<()> {
    let outcome = session.graph.toggle_follow(session.principal()?, target_id).await?;
    let message = match outcome {
        FollowOutcome::Followed => "Now following",
        FollowOutcome::Unfollowed => "Unfollowed",
        FollowOutcome::Requested => "Follow request sent to",
        FollowOutcome::RequestCancelled => "Follow request cancelled for",
    };
    output.success(&format!("{message} {target_id}"));
    Ok(())
}

pub async fn handle_block<S: GraphStore>(target_id: &str, session: &Session<S>, output: &OutputManager) -> Result<()> {
    match session.graph.toggle_block(session.principal()?, target_id).await? {
        BlockOutcome::Blocked => output.success(&format!("Blocked {target_id}")),
        BlockOutcome::Unblocked => output.success(&format!("Unblocked {target_id}")),
    }
    Ok(())
}
