/// Reply the model must give when the context does not contain the answer
pub const FALLBACK_ANSWER: &str = "Bağlamda cevap bulunamadı.";

/// Persona and refusal policy, sent as the system message
pub const SYSTEM_INSTRUCTION: &str = "Sen Türkçe konuşan bir yasal asistanısın. \
Kullanıcı soruyu sorduğunda, yalnızca sana verilen bağlamdaki bilgiyi kullanarak Türkçe yanıt ver. \
Eğer bilgiyi bağlamda bulamazsan, 'Bağlamda cevap bulunamadı.' şeklinde yanıt ver.";

/// Build the user message: chunk context, page context, question, instructions
pub fn assemble(query: &str, chunk_content: &str, page_content: &str) -> String {
    format!(
        "### BAĞLAM (PARÇALAR)\n\
         {chunk_content}\n\
         \n\
         ### BAĞLAM (SAYFALAR)\n\
         {page_content}\n\
         \n\
         ### SORU\n\
         {query}\n\
         \n\
         ### TALİMAT\n\
         - Sadece yukarıdaki bağlamdaki bilgiye dayanarak cevap ver.\n\
         - Bağlamda olmayan bilgiyi ekleme.\n\
         - Yanıtı Türkçe olarak ver.\n\
         - Cevap bağlamda yoksa yalnızca '{FALLBACK_ANSWER}' yaz.\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sections_in_order() {
        let prompt = assemble("Başkent neresidir?", "CHUNK TEXT", "PAGE TEXT");

        let positions: Vec<usize> = [
            "### BAĞLAM (PARÇALAR)",
            "CHUNK TEXT",
            "### BAĞLAM (SAYFALAR)",
            "PAGE TEXT",
            "### SORU",
            "Başkent neresidir?",
            "### TALİMAT",
        ]
        .iter()
        .map(|needle| prompt.find(needle).unwrap())
        .collect();

        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_footer_carries_fallback_phrase() {
        let prompt = assemble("q", "c", "p");
        let footer = &prompt[prompt.find("### TALİMAT").unwrap()..];
        assert!(footer.contains(FALLBACK_ANSWER));
        assert!(footer.contains("Türkçe"));
    }

    #[test]
    fn test_query_is_verbatim() {
        let query = "  Cumhurbaşkanının görev ve yetkileri nelerdir?  ";
        assert!(assemble(query, "c", "p").contains(query));
    }

    #[test]
    fn test_system_instruction_is_not_interpolated() {
        let prompt = assemble("q", "c", "p");
        assert!(!prompt.contains(SYSTEM_INSTRUCTION));
        assert!(SYSTEM_INSTRUCTION.contains(FALLBACK_ANSWER));
    }
}
