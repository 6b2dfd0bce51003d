use anyhow::Result;
use clap::Subcommand;

use feedgraph::{GraphStore, ToggleOutcome};

use crate::context::Session;
use crate::examples::ExampleGroup;
use crate::output::OutputManager;

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Threads",
    commands: &[
        "feedgraph --as <id> comment add <post-id> 'great shot'     # Root comment",
        "feedgraph --as <id> comment reply <comment-id> 'agreed'    # Nested reply",
        "feedgraph --as <id> comment tree <post-id>                 # Render the thread",
    ],
}];

#[derive(Subcommand)]
pub enum CommentCommands {
    /// Comment on a post
    #[command(name = "add")]
    Add { post_id: String, text: String },

    /// Reply to a comment
    #[command(name = "reply")]
    Reply { parent_id: String, text: String },

    /// Edit your comment
    #[command(name = "edit")]
    Edit { comment_id: String, text: String },

    /// Toggle your like on a comment
    #[command(name = "like")]
    Like { comment_id: String },

    /// List users who liked a comment
    #[command(name = "likers")]
    Likers { comment_id: String },

    /// Delete your root comment
    #[command(name = "delete")]
    Delete { comment_id: String },

    /// Delete a reply (author or admin)
    #[command(name = "delete-reply")]
    DeleteReply { reply_id: String },

    /// Show the comment tree of a post
    #[command(name = "tree")]
    Tree { post_id: String },
}

pub async fn handle_comment_commands<S: GraphStore>(
    command: CommentCommands,
    session: &Session<S>,
    output: &OutputManager,
) -> Result<()> {
    let graph = &session.graph;
    match command {
        CommentCommands::Add { post_id, text } => {
            let comment = graph.add_comment(session.principal()?, &post_id, &text).await?;
            output.success("Comment added");
            output.display(&comment)?;
        }
        CommentCommands::Reply { parent_id, text } => {
            let reply = graph.add_reply(session.principal()?, &parent_id, &text).await?;
            output.success("Reply added");
            output.display(&reply)?;
        }
        CommentCommands::Edit { comment_id, text } => {
            let comment = graph.edit_comment(session.principal()?, &comment_id, &text).await?;
            output.success("Comment updated");
            output.display(&comment)?;
        }
        CommentCommands::Like { comment_id } => {
            match graph.toggle_comment_like(session.principal()?, &comment_id).await? {
                ToggleOutcome::Added => output.success("Comment liked"),
                ToggleOutcome::Removed => output.success("Comment unliked"),
            }
        }
        CommentCommands::Likers { comment_id } => {
            output.rows(graph.comment_likers(&comment_id).await?)?;
        }
        CommentCommands::Delete { comment_id } => {
            graph.delete_comment(session.principal()?, &comment_id).await?;
            output.success(&format!("Deleted comment {comment_id}"));
        }
        CommentCommands::DeleteReply { reply_id } => {
            graph.delete_reply(session.principal()?, &reply_id).await?;
            output.success(&format!("Deleted reply {reply_id}"));
        }
        CommentCommands::Tree { post_id } => {
            let tree = graph.build_comment_tree(session.principal()?, &post_id).await?;
            output.comment_tree(&tree)?;
        }
    }
    Ok(())
}
