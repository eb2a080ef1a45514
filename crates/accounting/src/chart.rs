//! Chart of accounts.
//!
//! Codes are dotted paths ("5.2.1"). The store serves a flat node list; [`AccountPlan`]
//! turns it into an arena tree so group inheritance and rollups walk parent
//! indices instead of scanning code prefixes.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use finops_core::{DomainError, DomainResult, Money};

/// Natural classification of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Revenue,
    Cost,
    Expense,
}

impl core::str::FromStr for AccountType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "revenue" | "receita" => Ok(AccountType::Revenue),
            "cost" | "custo" => Ok(AccountType::Cost),
            "expense" | "despesa" => Ok(AccountType::Expense),
            other => Err(DomainError::validation(
                "account_type",
                format!("unknown account type {other:?}"),
            )),
        }
    }
}

/// One account as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountNode {
    pub code: String,
    pub name: String,
    pub account_type: AccountType,
    /// Statement group key; empty means "same as the parent".
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub subgroup: Option<String>,
}

impl AccountNode {
    pub fn new(code: &str, name: &str, account_type: AccountType, group: &str) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            account_type,
            group: group.to_string(),
            subgroup: None,
        }
    }
}

/// Arena tree over the chart. Nodes are kept sorted by code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountPlan {
    nodes: Vec<AccountNode>,
    parent: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
    depth: Vec<usize>,
    index: HashMap<String, usize>,
}

fn parent_code(code: &str) -> Option<&str> {
    code.rfind('.').map(|pos| &code[..pos])
}

impl AccountPlan {
    pub fn new(mut nodes: Vec<AccountNode>) -> DomainResult<Self> {
        for node in &mut nodes {
            node.code = node.code.trim().to_string();
            if node.code.is_empty() || node.code.split('.').any(str::is_empty) {
                return Err(DomainError::validation(
                    "code",
                    format!("malformed account code {:?}", node.code),
                ));
            }
        }
        nodes.sort_by(|a, b| compare_codes(&a.code, &b.code));

        let mut index = HashMap::with_capacity(nodes.len());
        for (idx, node) in nodes.iter().enumerate() {
            if index.insert(node.code.clone(), idx).is_some() {
                return Err(DomainError::validation(
                    "code",
                    format!("duplicate account code {}", node.code),
                ));
            }
        }

        // Nearest existing ancestor by code prefix; missing intermediate levels are skipped.
        let parent: Vec<Option<usize>> = nodes
            .iter()
            .map(|node| {
                let mut code = parent_code(&node.code);
                while let Some(candidate) = code {
                    if let Some(&idx) = index.get(candidate) {
                        return Some(idx);
                    }
                    code = parent_code(candidate);
                }
                None
            })
            .collect();

        let mut children = vec![Vec::new(); nodes.len()];
        let mut depth = vec![0usize; nodes.len()];
        // Sorted by code, so every parent precedes its children.
        for idx in 0..nodes.len() {
            if let Some(p) = parent[idx] {
                children[p].push(idx);
                depth[idx] = depth[p] + 1;
            }
        }

        Ok(Self {
            nodes,
            parent,
            children,
            depth,
            index,
        })
    }

    /// The built-in chart for a small Brazilian business.
    pub fn default_plan() -> Self {
        Self::new(default_chart()).unwrap_or_else(|_| Self::empty())
    }

    pub fn empty() -> Self {
        Self {
            nodes: Vec::new(),
            parent: Vec::new(),
            children: Vec::new(),
            depth: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in code order.
    pub fn nodes(&self) -> &[AccountNode] {
        &self.nodes
    }

    pub fn index_of(&self, code: &str) -> Option<usize> {
        self.index.get(code).copied()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.index.contains_key(code)
    }

    pub fn node(&self, idx: usize) -> &AccountNode {
        &self.nodes[idx]
    }

    pub fn depth_of(&self, code: &str) -> Option<usize> {
        self.index_of(code).map(|idx| self.depth[idx])
    }

    pub fn roots(&self) -> impl Iterator<Item = &AccountNode> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(idx, _)| self.parent[*idx].is_none())
            .map(|(_, node)| node)
    }

    pub fn children_of(&self, code: &str) -> Vec<&AccountNode> {
        self.index_of(code)
            .map(|idx| self.children[idx].iter().map(|&c| &self.nodes[c]).collect())
            .unwrap_or_default()
    }

    fn ancestor_indices(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(self.parent[idx], move |&p| self.parent[p])
    }

    /// Group key of the node at `idx`, inherited from the nearest ancestor when empty.
    pub fn resolved_group(&self, idx: usize) -> &str {
        std::iter::once(idx)
            .chain(self.ancestor_indices(idx))
            .map(|i| self.nodes[i].group.trim())
            .find(|g| !g.is_empty())
            .unwrap_or("")
    }

    /// Adds every node's own sum into itself and all its ancestors, so each result
    /// is the node's total including descendants.
    pub fn rollup(&self, sums: &BTreeMap<String, Money>) -> DomainResult<BTreeMap<String, Money>> {
        let mut totals: BTreeMap<String, Money> = BTreeMap::new();
        for (code, amount) in sums {
            let idx = self
                .index_of(code)
                .ok_or_else(|| DomainError::not_found("account", code))?;
            for i in std::iter::once(idx).chain(self.ancestor_indices(idx)) {
                *totals.entry(self.nodes[i].code.clone()).or_default() += *amount;
            }
        }
        Ok(totals)
    }
}

/// Orders dotted codes segment by segment, numerically where both segments are numbers.
pub fn compare_codes(a: &str, b: &str) -> std::cmp::Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return std::cmp::Ordering::Equal,
            (None, Some(_)) => return std::cmp::Ordering::Less,
            (Some(_), None) => return std::cmp::Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(nx), Ok(ny)) => nx.cmp(&ny),
                    _ => x.cmp(y),
                };
                if ord != std::cmp::Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

/// Default chart nodes. Leaves leave the group empty and inherit it.
pub fn default_chart() -> Vec<AccountNode> {
    use AccountType::{Cost, Expense, Revenue};

    vec![
        AccountNode::new("3", "Receitas", Revenue, "receita_bruta"),
        AccountNode::new("3.1", "Receita bruta", Revenue, "receita_bruta"),
        AccountNode::new("3.1.1", "Venda de mercadorias", Revenue, ""),
        AccountNode::new("3.1.2", "Prestação de serviços", Revenue, ""),
        AccountNode::new("3.2", "Deduções da receita", Revenue, "deducoes"),
        AccountNode::new("3.2.1", "Impostos sobre vendas", Revenue, ""),
        AccountNode::new("3.2.2", "Devoluções e abatimentos", Revenue, ""),
        AccountNode::new("3.3", "Outras receitas", Revenue, "outras_receitas"),
        AccountNode::new("3.3.1", "Receitas financeiras", Revenue, "financeira"),
        AccountNode::new("3.3.2", "Receitas diversas", Revenue, ""),
        AccountNode::new("4", "Custos", Cost, "custos_vendas"),
        AccountNode::new("4.1", "Custo das mercadorias vendidas", Cost, ""),
        AccountNode::new("4.2", "Custo dos serviços prestados", Cost, ""),
        AccountNode::new("5", "Despesas", Expense, "despesas_operacionais"),
        AccountNode::new("5.1", "Despesas operacionais", Expense, "despesas_operacionais"),
        AccountNode::new("5.1.1", "Água e esgoto", Expense, ""),
        AccountNode::new("5.1.2", "Energia elétrica", Expense, ""),
        AccountNode::new("5.1.3", "Internet", Expense, ""),
        AccountNode::new("5.1.4", "Telefone", Expense, ""),
        AccountNode::new("5.1.5", "Manutenção", Expense, ""),
        AccountNode::new("5.1.6", "Transporte", Expense, ""),
        AccountNode::new("5.1.7", "Fornecedores", Expense, ""),
        AccountNode::new("5.2", "Despesas administrativas", Expense, "despesas_administrativas"),
        AccountNode::new("5.2.1", "Aluguel", Expense, ""),
        AccountNode::new("5.2.2", "Folha de pagamento", Expense, ""),
        AccountNode::new("5.2.3", "Material de escritório", Expense, ""),
        AccountNode::new("5.2.4", "Serviços contábeis", Expense, ""),
        AccountNode::new("5.2.5", "Seguros", Expense, ""),
        AccountNode::new("5.2.6", "Impostos e taxas", Expense, ""),
        AccountNode::new("5.3", "Despesas com vendas", Expense, "despesas_vendas"),
        AccountNode::new("5.3.1", "Marketing e publicidade", Expense, ""),
        AccountNode::new("5.4", "Despesas financeiras", Expense, "despesas_financeiras"),
        AccountNode::new("5.4.1", "Tarifas bancárias", Expense, ""),
        AccountNode::new("5.4.2", "Juros e multas", Expense, ""),
        AccountNode::new("5.5", "Outras despesas", Expense, "outras_despesas"),
        AccountNode::new("5.5.1", "Despesas diversas", Expense, ""),
        AccountNode::new("6", "Impostos sobre o lucro", Expense, "impostos"),
        AccountNode::new("6.1", "IRPJ e CSLL", Expense, ""),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> AccountPlan {
        AccountPlan::default_plan()
    }

    #[test]
    fn default_chart_builds_a_forest() {
        let plan = plan();
        assert_eq!(plan.len(), default_chart().len());
        let roots: Vec<_> = plan.roots().map(|n| n.code.as_str()).collect();
        assert_eq!(roots, vec!["3", "4", "5", "6"]);
    }

    #[test]
    fn children_and_depth_follow_codes() {
        let plan = plan();
        let children: Vec<_> = plan.children_of("3").iter().map(|n| n.code.clone()).collect();
        assert_eq!(children, vec!["3.1", "3.2", "3.3"]);
        let leaves: Vec<_> = plan.children_of("3.1").iter().map(|n| n.code.clone()).collect();
        assert_eq!(leaves, vec!["3.1.1", "3.1.2"]);
        assert_eq!(plan.depth_of("5.2.1"), Some(2));
        assert_eq!(plan.depth_of("5"), Some(0));
        assert!(plan.children_of("9").is_empty());
    }

    #[test]
    fn codes_sort_numerically_by_segment() {
        let plan = AccountPlan::new(vec![
            AccountNode::new("5.10", "Ten", AccountType::Expense, "x"),
            AccountNode::new("5.2", "Two", AccountType::Expense, "x"),
            AccountNode::new("5", "Root", AccountType::Expense, "x"),
        ])
        .unwrap();
        let codes: Vec<_> = plan.nodes().iter().map(|n| n.code.as_str()).collect();
        assert_eq!(codes, vec!["5", "5.2", "5.10"]);
    }

    #[test]
    fn missing_intermediate_level_attaches_to_nearest_ancestor() {
        let plan = AccountPlan::new(vec![
            AccountNode::new("5", "Despesas", AccountType::Expense, "outras"),
            AccountNode::new("5.9.1", "Orphan", AccountType::Expense, ""),
        ])
        .unwrap();
        let children: Vec<_> = plan.children_of("5").iter().map(|n| n.code.as_str()).collect();
        assert_eq!(children, vec!["5.9.1"]);
        assert_eq!(plan.depth_of("5.9.1"), Some(1));
        let idx = plan.index_of("5.9.1").unwrap();
        assert_eq!(plan.resolved_group(idx), "outras");
    }

    #[test]
    fn duplicate_or_malformed_codes_are_rejected() {
        let dup = AccountPlan::new(vec![
            AccountNode::new("5", "A", AccountType::Expense, "x"),
            AccountNode::new("5", "B", AccountType::Expense, "x"),
        ]);
        assert_eq!(dup.unwrap_err().field(), Some("code"));
        let bad = AccountPlan::new(vec![AccountNode::new("5..1", "A", AccountType::Expense, "x")]);
        assert_eq!(bad.unwrap_err().field(), Some("code"));
    }

    #[test]
    fn rollup_adds_into_every_ancestor() {
        let plan = plan();
        let mut sums = BTreeMap::new();
        sums.insert("5.2.1".to_string(), Money::new(1000, 0));
        sums.insert("5.2.2".to_string(), Money::new(500, 0));
        sums.insert("5.1.2".to_string(), Money::new(200, 0));
        let totals = plan.rollup(&sums).unwrap();
        assert_eq!(totals["5.2"], Money::new(1500, 0));
        assert_eq!(totals["5"], Money::new(1700, 0));
        assert_eq!(totals["5.2.1"], Money::new(1000, 0));

        sums.insert("9.9".to_string(), Money::new(1, 0));
        assert!(matches!(plan.rollup(&sums), Err(DomainError::NotFound { .. })));
    }

    #[test]
    fn account_type_parses_portuguese() {
        assert_eq!("despesa".parse::<AccountType>().unwrap(), AccountType::Expense);
        assert_eq!("x".parse::<AccountType>().unwrap_err().field(), Some("account_type"));
    }
}
