use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use log::info;
use std::path::PathBuf;
use std::sync::Arc;

use anayasa_rag::cache::SessionCache;
use anayasa_rag::chunking::DocumentSplitter;
use anayasa_rag::config::Settings;
use anayasa_rag::database::{QdrantStore, VectorStore};
use anayasa_rag::document::Document;
use anayasa_rag::embeddings::{Embedder, HttpEmbedder};
use anayasa_rag::export::{append_record, QaRecord};
use anayasa_rag::index::Indexer;
use anayasa_rag::llm::{AnswerGenerator, OpenAiChatClient};
use anayasa_rag::rag::{print_response, RagEngine};
use anayasa_rag::retrieval::Retriever;

/// Question answering over the Turkish constitution, backed by Qdrant and an OpenAI-compatible model
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the document to index (PDF, or text with form-feed page breaks)
    #[arg(index = 1, default_value = "data/gerekceli_anayasa.pdf")]
    file_path: PathBuf,

    /// Answer a single question and exit instead of starting the interactive loop
    #[arg(short, long)]
    question: Option<String>,

    /// CSV file answers are saved to
    #[arg(short, long, default_value = "anayasa_qa.csv")]
    export: PathBuf,

    /// Save the answer to --question in the export file
    #[arg(long, requires = "question")]
    save: bool,

    /// Also print the retrieved passages
    #[arg(long)]
    show_sources: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    // Missing credentials must stop us before any work is done
    let settings = Settings::from_env().context("Invalid configuration")?;

    info!("Processing file: {}", args.file_path.display());

    let store: Arc<dyn VectorStore> = Arc::new(
        QdrantStore::new(settings.qdrant.clone()).context("Failed to initialize Qdrant client")?,
    );
    store
        .ping()
        .await
        .with_context(|| format!("Qdrant is not reachable at {}", settings.qdrant.url))?;

    let embedder: Arc<dyn Embedder> = Arc::new(
        HttpEmbedder::new(settings.embedding.clone())
            .context("Failed to initialize embedding client")?,
    );
    let chat = Arc::new(
        OpenAiChatClient::new(settings.chat.clone()).context("Failed to initialize chat client")?,
    );

    let splitter = DocumentSplitter::new(settings.splitter.clone())?;
    let indexer = Indexer::new(
        Arc::clone(&embedder),
        Arc::clone(&store),
        settings.embedding.batch_size,
    );

    let source = args.file_path.display().to_string();
    let cache = SessionCache::new();
    let indices = cache
        .get_or_build(&source, || {
            let path = &args.file_path;
            let splitter = &splitter;
            let indexer = &indexer;
            async move {
                let document = Document::from_file(path)?;
                info!("Document type: {}", document.mime_type);
                let split = splitter.split(&document);
                indexer.build_document(&document.source, split).await
            }
        })
        .await
        .context("Failed to build indices")?;

    let rag_engine = RagEngine::new(
        Retriever::new(Arc::clone(&embedder), settings.retrieval.clone()),
        AnswerGenerator::new(chat, &settings.chat),
    );

    if let Some(question) = args.question.as_deref() {
        let response = rag_engine
            .ask(question, &indices)
            .await
            .context("Failed to answer question")?;
        print_response(&response, args.show_sources);

        if args.save {
            append_record(
                &args.export,
                &QaRecord {
                    question: question.to_string(),
                    answer: response.answer.text,
                },
            )?;
        }
        return Ok(());
    }

    // Enter interactive Q&A loop
    rag_engine
        .run_query_loop(&indices, &args.export, args.show_sources)
        .await
        .context("Error in query loop")?;

    Ok(())
}
