use std::path::PathBuf;

use anyhow::Result;
use clap::Subcommand;

use feedgraph::{GraphStore, NewAudio, NewPost, PostPatch, PostStatus, ToggleOutcome};

use crate::context::{Session, read_optional_upload, read_upload};
use crate::examples::ExampleGroup;
use crate::output::OutputManager;

pub const EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Publishing",
        commands: &[
            "feedgraph --as <id> post create --caption 'sunset' --image sunset.jpg",
            "feedgraph --as <id> post create --caption 'wip' --draft   # Save as draft",
            "feedgraph --as <id> post publish <post-id>               # Publish a draft",
        ],
    },
    ExampleGroup {
        title: "Engagement",
        commands: &[
            "feedgraph --as <id> post like <post-id>      # Toggle a like",
            "feedgraph --as <id> post save <post-id>      # Toggle a save",
            "feedgraph post likers <post-id>              # Who liked a post",
        ],
    },
];

pub const AUDIO_EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Audio tracks",
    commands: &[
        "feedgraph audio register 'Night Drive' --track drive.mp3 --artist 'Kai'",
        "feedgraph audio show <audio-id>",
    ],
}];

#[derive(Subcommand)]
pub enum PostCommands {
    /// Create a post or a draft
    #[command(name = "create")]
    Create {
        #[arg(long)]
        caption: Option<String>,

        #[arg(long)]
        image: Option<PathBuf>,

        #[arg(long)]
        video: Option<PathBuf>,

        /// Audio track id to attach
        #[arg(long)]
        audio: Option<String>,

        /// User id to tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Keep the post as a draft
        #[arg(long)]
        draft: bool,
    },

    /// Show a single post
    #[command(name = "show")]
    Show { post_id: String },

    /// Replace caption, image or video
    #[command(name = "update")]
    Update {
        post_id: String,

        #[arg(long)]
        caption: Option<String>,

        #[arg(long)]
        image: Option<PathBuf>,

        #[arg(long)]
        video: Option<PathBuf>,
    },

    /// Delete a post with its comments and media
    #[command(name = "delete")]
    Delete { post_id: String },

    /// Publish a draft
    #[command(name = "publish")]
    Publish { post_id: String },

    /// Permanently delete a draft
    #[command(name = "remove-draft")]
    RemoveDraft { post_id: String },

    /// Toggle your like on a post
    #[command(name = "like")]
    Like { post_id: String },

    /// Remove your like from a post
    #[command(name = "unlike")]
    Unlike { post_id: String },

    /// Toggle a post in your saved list
    #[command(name = "save")]
    Save { post_id: String },

    /// List users who liked a post
    #[command(name = "likers")]
    Likers { post_id: String },
}

#[derive(Subcommand)]
pub enum AudioCommands {
    /// Register an audio track posts can reference
    #[command(name = "register")]
    Register {
        name: String,

        #[arg(long)]
        track: PathBuf,

        #[arg(long)]
        cover: Option<PathBuf>,

        /// Artist name (repeatable)
        #[arg(long = "artist")]
        artists: Vec<String>,
    },

    /// Show an audio track
    #[command(name = "show")]
    Show { audio_id: String },
}

pub async fn handle_post_commands<S: GraphStore>(
    command: PostCommands,
    session: &Session<S>,
    output: &OutputManager,
) -> Result<()> {
    let graph = &session.graph;
    match command {
        PostCommands::Create {
            caption,
            image,
            video,
            audio,
            tags,
            draft,
        } => {
            let new_post = NewPost {
                caption,
                image: read_optional_upload(image.as_deref()).await?,
                video: read_optional_upload(video.as_deref()).await?,
                audio_id: audio,
                tagged_friends: tags,
                status: draft.then_some(PostStatus::Draft),
            };
            let post = graph.create_post(session.principal()?, new_post).await?;
            output.success(&format!("Created {} post {}", output.status_badge(post.status()), post.id()));
            output.display(&post)?;
        }
        PostCommands::Show { post_id } => {
            output.display(&graph.get_post(session.principal()?, &post_id).await?)?;
        }
        PostCommands::Update {
            post_id,
            caption,
            image,
            video,
        } => {
            let patch = PostPatch {
                caption,
                image: read_optional_upload(image.as_deref()).await?,
                video: read_optional_upload(video.as_deref()).await?,
            };
            let post = graph.update_post(session.principal()?, &post_id, patch).await?;
            output.success("Post updated");
            output.display(&post)?;
        }
        PostCommands::Delete { post_id } => {
            graph.delete_post(session.principal()?, &post_id).await?;
            output.success(&format!("Deleted post {post_id}"));
        }
        PostCommands::Publish { post_id } => {
            let post = graph.publish_post(session.principal()?, &post_id).await?;
            output.success(&format!("Published post {} ({})", post.id(), output.status_badge(post.status())));
        }
        PostCommands::RemoveDraft { post_id } => {
            graph.remove_draft(session.principal()?, &post_id).await?;
            output.success(&format!("Removed draft {post_id}"));
        }
        PostCommands::Like { post_id } => match graph.toggle_like(session.principal()?, &post_id).await? {
            ToggleOutcome::Added => output.success("Post liked"),
            ToggleOutcome::Removed => output.success("Post unliked"),
        },
        PostCommands::Unlike { post_id } => {
            if graph.unlike_post(session.principal()?, &post_id).await? {
                output.success("Post unliked");
            } else {
                output.warning("You had not liked this post");
            }
        }
        PostCommands::Save { post_id } => match graph.toggle_save(session.principal()?, &post_id).await? {
            ToggleOutcome::Added => output.success("Post saved"),
            ToggleOutcome::Removed => output.success("Post removed from saved"),
        },
        PostCommands::Likers { post_id } => {
            output.rows(graph.post_likers(&post_id).await?)?;
        }
    }
    Ok(())
}

pub async fn handle_audio_commands<S: GraphStore>(
    command: AudioCommands,
    session: &Session<S>,
    output: &OutputManager,
) -> Result<()> {
    match command {
        AudioCommands::Register {
            name,
            track,
            cover,
            artists,
        } => {
            let new_audio = NewAudio {
                name,
                artists,
                track: read_upload(&track).await?,
                cover: read_optional_upload(cover.as_deref()).await?,
            };
            let audio = session.graph.register_audio(new_audio).await?;
            output.success(&format!("Registered audio {}", audio.id));
            output.display(&audio)?;
        }
        AudioCommands::Show { audio_id } => {
            output.display(&session.graph.get_audio(&audio_id).await?)?;
        }
    }
    Ok(())
}
