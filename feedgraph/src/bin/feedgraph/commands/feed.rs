use anyhow::Result;
use clap::Subcommand;

use feedgraph::GraphStore;

use crate::context::Session;
use crate::examples::ExampleGroup;
use crate::output::OutputManager;

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Feeds",
    commands: &[
        "feedgraph --as <id> feed global                # Every visible post",
        "feedgraph --as <id> feed following             # Posts of people you follow",
        "feedgraph --as <id> feed profile <user-id>     # One user's published posts",
        "feedgraph --as <id> --output json feed drafts  # Your drafts as JSON",
    ],
}];

#[derive(Subcommand)]
pub enum FeedCommands {
    /// All published posts
    #[command(name = "global")]
    Global,

    /// Posts of users you follow
    #[command(name = "following")]
    Following,

    /// Posts using an audio track
    #[command(name = "audio")]
    Audio { audio_id: String },

    /// Posts you are tagged on
    #[command(name = "tagged")]
    Tagged,

    /// Posts you saved
    #[command(name = "saved")]
    Saved,

    /// Posts you liked
    #[command(name = "liked")]
    Liked,

    /// Published posts of a user
    #[command(name = "profile")]
    Profile { user_id: String },

    /// Your drafts
    #[command(name = "drafts")]
    Drafts,
}

pub async fn handle_feed_commands<S: GraphStore>(
    command: FeedCommands,
    session: &Session<S>,
    output: &OutputManager,
) -> Result<()> {
    let graph = &session.graph;
    let viewer = session.principal()?;
    let posts = match command {
        FeedCommands::Global => graph.global_feed(viewer).await?,
        FeedCommands::Following => graph.following_feed(viewer).await?,
        FeedCommands::Audio { audio_id } => graph.audio_feed(viewer, &audio_id).await?,
        FeedCommands::Tagged => graph.tagged_feed(viewer).await?,
        FeedCommands::Saved => graph.saved_posts(viewer).await?,
        FeedCommands::Liked => graph.liked_posts(viewer).await?,
        FeedCommands::Profile { user_id } => graph.profile_posts(viewer, &user_id).await?,
        FeedCommands::Drafts => graph.drafts(viewer).await?,
    };
    output.rows(posts)
}
