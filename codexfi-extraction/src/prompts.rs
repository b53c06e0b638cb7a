//! The five prompt templates. Each returns a (system, user) pair.

use codexfi_core::memory::ContradictionCandidate;

const TYPE_TAXONOMY: &str = "\
Valid types:\n\
- project-brief: what the project is and its goals\n\
- architecture: system design, patterns, key components\n\
- tech-context: languages, frameworks, databases, tooling\n\
- product-context: users, requirements, product decisions\n\
- project-config: build, deploy, environment configuration\n\
- error-solution: a specific error and how it was fixed\n\
- preference: how the user likes to work or communicate\n\
- learned-pattern: a reusable insight about this codebase or workflow\n\
- conversation: a notable fact from the discussion itself";

/// Turn transcript → JSON array of typed facts.
pub fn extraction(transcript: &str) -> (String, String) {
    let system = format!(
        "You extract durable facts from a coding session so they can be \
         recalled in future sessions.\n\n\
         Return ONLY a JSON array. Each element is {{\"memory\": string, \
         \"type\": string}}. Extract facts that stay true beyond this \
         conversation: decisions, project structure, tooling, user \
         preferences, solved errors. Skip pleasantries, speculation, and \
         anything that will be obvious from the code itself. Return [] \
         when nothing qualifies.\n\n{TYPE_TAXONOMY}"
    );
    (system, format!("Conversation:\n{transcript}"))
}

/// Concatenated project files → JSON array of typed facts.
pub fn init_extraction(files: &str) -> (String, String) {
    let system = format!(
        "You are seeding a project memory from its files (README, \
         manifests, configs).\n\n\
         Return ONLY a JSON array of {{\"memory\": string, \"type\": \
         string}}. Capture what the project is, its stack, its structure, \
         and how it is built and run. Prefer a few dense facts over many \
         thin ones. Return [] if the files reveal nothing.\n\n{TYPE_TAXONOMY}"
    );
    (system, format!("Project files:\n{files}"))
}

/// Message window → exactly one summary fact.
pub fn summary(transcript: &str) -> (String, String) {
    let system = "You summarize a working session.\n\n\
         Return ONLY a JSON array containing exactly one element: \
         {\"memory\": string, \"type\": \"session-summary\"}. The memory \
         is 2-4 sentences: what was worked on, what was decided, what is \
         unfinished."
        .to_string();
    (system, format!("Session messages:\n{transcript}"))
}

/// New memory + candidate old memories → ids the new memory obsoletes.
pub fn contradiction(new_memory: &str, candidates: &[ContradictionCandidate]) -> (String, String) {
    let system = "You decide which stored memories a new memory makes \
         obsolete.\n\n\
         Return ONLY a JSON array of ids (possibly empty). Include an id \
         only when the new memory states something that REPLACES or \
         CONTRADICTS that memory, such as a migration, a rename, or a \
         reversed decision. Memories that merely relate to the same topic \
         are NOT obsolete."
        .to_string();
    let listing = candidates
        .iter()
        .map(|c| format!("- id: {}\n  memory: {}", c.id, c.memory))
        .collect::<Vec<_>>()
        .join("\n");
    let user = format!("New memory:\n{new_memory}\n\nStored memories:\n{listing}");
    (system, user)
}

/// Verbose session summary → one compact learned-pattern fact.
pub fn condense(summary: &str) -> (String, String) {
    let system = "You compress an old session summary into one durable \
         insight.\n\n\
         Return ONLY a JSON array containing exactly one element: \
         {\"memory\": string, \"type\": \"learned-pattern\"}. Keep what \
         remains useful months later; drop play-by-play detail."
        .to_string();
    (system, format!("Old session summary:\n{summary}"))
}
