use crate::error::Result;
use crate::export::{append_record, QaRecord};
use crate::index::DocumentIndices;
use crate::llm::{Answer, AnswerGenerator};
use crate::prompt::{assemble, SYSTEM_INSTRUCTION};
use crate::retrieval::{RetrievalResult, Retriever};
use log::{error, info};
use std::io::{self, BufRead, Write};
use std::path::Path;

/// Example questions offered at the prompt
pub const SUGGESTED_QUESTIONS: [&str; 3] = [
    "Temel hak ve hürriyetlerin sınırlanması hangi durumlarda gerçekleşebilir?",
    "Cumhurbaşkanının görev ve yetkileri nelerdir?",
    "Kanunların Anayasaya uygunluğunu kim denetler?",
];

const EXIT_COMMAND: &str = "exit";
const SAVE_COMMAND: &str = "kaydet";

/// Everything produced for one question
#[derive(Debug, Clone)]
pub struct RagResponse {
    pub answer: Answer,
    pub retrieval: RetrievalResult,
}

impl RagResponse {
    /// Retrieved text, chunks first
    pub fn content(&self) -> String {
        self.retrieval.content()
    }

    /// Citation lines, pages first
    pub fn metadata(&self) -> String {
        self.retrieval.metadata()
    }
}

/// RAG (Retrieval-Augmented Generation) engine
pub struct RagEngine {
    retriever: Retriever,
    generator: AnswerGenerator,
}

impl RagEngine {
    /// Create a new RAG engine
    pub fn new(retriever: Retriever, generator: AnswerGenerator) -> Self {
        RagEngine {
            retriever,
            generator,
        }
    }

    /// Answer one question from the given indices
    pub async fn ask(&self, query: &str, indices: &DocumentIndices) -> Result<RagResponse> {
        let retrieval = self
            .retriever
            .retrieve(query, &indices.pages, &indices.chunks)
            .await?;

        let prompt = assemble(query, &retrieval.chunk_content(), &retrieval.page_content());
        let answer = self.generator.generate(SYSTEM_INSTRUCTION, &prompt).await?;

        Ok(RagResponse { answer, retrieval })
    }

    /// Run the query loop over stdin until `exit` or end of input
    pub async fn run_query_loop(
        &self,
        indices: &DocumentIndices,
        export_path: &Path,
        show_sources: bool,
    ) -> anyhow::Result<()> {
        println!(
            "Ready to answer questions about {}. Type '{}' to quit, '{}' to save the last answer.",
            indices.source, EXIT_COMMAND, SAVE_COMMAND
        );
        println!("\nÖnerilen Sorular:");
        for (i, question) in SUGGESTED_QUESTIONS.iter().enumerate() {
            println!("  {}. {}", i + 1, question);
        }

        let stdin = io::stdin();
        let mut stdout = io::stdout();
        let mut buffer = String::new();
        let mut last: Option<QaRecord> = None;

        loop {
            print!("\nSorunuz: ");
            stdout.flush()?;

            buffer.clear();
            if stdin.lock().read_line(&mut buffer)? == 0 {
                break;
            }

            let input = buffer.trim();
            if input.is_empty() {
                continue;
            }

            if input.eq_ignore_ascii_case(EXIT_COMMAND) {
                info!("Goodbye!");
                break;
            }

            if input.eq_ignore_ascii_case(SAVE_COMMAND) {
                match &last {
                    Some(record) => match append_record(export_path, record) {
                        Ok(()) => println!("Cevap {} dosyasına kaydedildi.", export_path.display()),
                        Err(e) => error!("{}", e),
                    },
                    None => println!("Kaydedilecek bir cevap yok."),
                }
                continue;
            }

            let question = resolve_question(input);

            match self.ask(question, indices).await {
                Ok(response) => {
                    print_response(&response, show_sources);
                    last = Some(QaRecord {
                        question: question.to_string(),
                        answer: response.answer.text,
                    });
                }
                // A failed query leaves the indices intact for the next one
                Err(e) => error!("{}", e),
            }
        }

        Ok(())
    }
}

/// Map `1`..`3` to the suggested questions, anything else is taken as typed
pub fn resolve_question(input: &str) -> &str {
    input
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| SUGGESTED_QUESTIONS.get(i).copied())
        .unwrap_or(input)
}

pub fn print_response(response: &RagResponse, show_sources: bool) {
    println!("\n### Cevap\n{}", response.answer.text);
    println!("\n### Kaynak Dökümanlar\n{}", response.metadata());
    if show_sources {
        println!("\n### Kaynak İçeriği\n{}", response.content());
    }
}
