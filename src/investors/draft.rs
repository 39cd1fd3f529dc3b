use crate::api::CreateInvestorRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagField {
    FocusAreas,
    DealBreakers,
}

/// 尚未提交的投资人档案
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvestorDraft {
    pub email: String,
    pub name: String,
    pub investment_thesis: String,
    pub focus_areas: Vec<String>,
    pub deal_breakers: Vec<String>,
}

impl InvestorDraft {
    pub fn tags(&self, field: TagField) -> &[String] {
        match field {
            TagField::FocusAreas => &self.focus_areas,
            TagField::DealBreakers => &self.deal_breakers,
        }
    }

    fn tags_mut(&mut self, field: TagField) -> &mut Vec<String> {
        match field {
            TagField::FocusAreas => &mut self.focus_areas,
            TagField::DealBreakers => &mut self.deal_breakers,
        }
    }

    /// 追加标签；去掉首尾空白后为空则忽略
    pub fn add_tag(&mut self, field: TagField, text: &str) -> bool {
        let tag = text.trim();
        if tag.is_empty() {
            return false;
        }
        self.tags_mut(field).push(tag.to_string());
        true
    }

    /// 按位置删除标签，其余标签保持原有顺序
    pub fn remove_tag(&mut self, field: TagField, index: usize) -> Option<String> {
        let tags = self.tags_mut(field);
        if index < tags.len() {
            Some(tags.remove(index))
        } else {
            None
        }
    }

    /// 只要求邮箱非空
    pub fn can_submit(&self) -> bool {
        !self.email.trim().is_empty()
    }

    pub fn to_request(&self) -> CreateInvestorRequest {
        let opt = |s: &str| {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        };
        CreateInvestorRequest {
            email: self.email.trim().to_string(),
            name: opt(&self.name),
            investment_thesis: opt(&self.investment_thesis),
            focus_areas: self.focus_areas.clone(),
            deal_breakers: self.deal_breakers.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_tags_are_ignored_and_text_is_trimmed() {
        let mut d = InvestorDraft::default();
        assert!(!d.add_tag(TagField::FocusAreas, "   "));
        assert!(!d.add_tag(TagField::DealBreakers, ""));
        assert!(d.add_tag(TagField::FocusAreas, "  B2B SaaS "));
        assert_eq!(d.focus_areas, vec!["B2B SaaS"]);
        assert!(d.deal_breakers.is_empty());
    }

    #[test]
    fn remove_by_position_keeps_relative_order() {
        let mut d = InvestorDraft::default();
        for t in ["a", "b", "c", "d"] {
            d.add_tag(TagField::DealBreakers, t);
        }
        assert_eq!(d.remove_tag(TagField::DealBreakers, 1).as_deref(), Some("b"));
        assert_eq!(d.deal_breakers, vec!["a", "c", "d"]);
        assert_eq!(d.remove_tag(TagField::DealBreakers, 5), None);
        assert_eq!(d.deal_breakers.len(), 3);
    }

    #[test]
    fn submit_requires_only_email() {
        let mut d = InvestorDraft::default();
        d.name = "Ada".to_string();
        assert!(!d.can_submit());
        d.email = " ".to_string();
        assert!(!d.can_submit());
        d.email = "ada@fund.vc".to_string();
        assert!(d.can_submit());
    }

    #[test]
    fn request_omits_blank_optionals() {
        let mut d = InvestorDraft {
            email: " ada@fund.vc ".to_string(),
            name: "  ".to_string(),
            investment_thesis: "Seed fintech".to_string(),
            ..Default::default()
        };
        d.add_tag(TagField::FocusAreas, "fintech");
        let req = d.to_request();
        assert_eq!(req.email, "ada@fund.vc");
        assert_eq!(req.name, None);
        assert_eq!(req.investment_thesis.as_deref(), Some("Seed fintech"));
        assert_eq!(req.focus_areas, vec!["fintech"]);
        assert!(req.deal_breakers.is_empty());
    }
}
