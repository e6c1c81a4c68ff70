//! Prompt composition.
//!
//! A query is the prompt text, the case's clinical attributes as
//! `column: value` lines, and the answering rules that ask for a JSON answer.

use crate::cases::CaseRecord;
use crate::config::PromptSpec;
use std::fmt::Write as FmtWrite;

/// Instructions appended to every prompt so the answer can be parsed
pub const DEFAULT_ANSWERING_RULES: &str = "\
Com base nessas informacoes, qual e a cor de atendimento do paciente?
Nao utilize emojis ou outros caracteres na resposta e escreva a explicacao em texto corrido.
Responda **apenas** com JSON puro, sem markdown, sem texto antes ou depois. Exemplo de saída esperada: {\"resposta\":\"...\", \"explicacao\":\"...\"}
Responda no formato json, com as chaves \"resposta\" e \"explicacao\".";

/// Identifier under which a prompt's results are recorded
#[must_use]
pub fn prompt_key(id: u32) -> String {
    format!("prompt_{id}")
}

/// Clinical attributes of a case, one `column: value` line each
#[must_use]
pub fn patient_info(case: &CaseRecord) -> String {
    let mut info = String::new();
    for (column, value) in &case.attributes {
        writeln!(info, "{column}: {value}").ok();
    }
    info
}

/// Full query text for one prompt and case
#[must_use]
pub fn compose(prompt: &PromptSpec, case: &CaseRecord, rules: &str) -> String {
    format!("{} \n{}\n{}", prompt.text, patient_info(case), rules)
}
